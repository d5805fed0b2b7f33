#[macro_export]
macro_rules! log_err {
    ($expr:expr) => {{
        match $expr {
            Ok(v) => Some(v),
            Err(e) => {
                log::error!("{}", e);
                None
            }
        }
    }};
}
