use flexi_logger::*;
use std::{io, path::PathBuf};

use crate::PROJECT_DIRS;

const MAX_LOG_SIZE: u64 = 8 * 1024 * 1024;

pub fn log_dir() -> PathBuf {
    PROJECT_DIRS.data_dir().join("logs")
}

/// `level` is a flexi_logger spec like `info` or `mountkeeper::process=debug`;
/// `RUST_LOG` wins when set.
pub fn init(level: &str) -> anyhow::Result<LoggerHandle> {
    let files = FileSpec::default()
        .directory(log_dir())
        .basename("mountkeeper");

    Ok(Logger::try_with_env_or_str(level)?
        .log_to_file(files)
        .format_for_files(line_per_record)
        .rotate(
            Criterion::Size(MAX_LOG_SIZE),
            Naming::Timestamps,
            Cleanup::KeepLogAndCompressedFiles(8, 32),
        )
        .duplicate_to_stderr(Duplicate::Info)
        .format_for_stderr(terminal)
        .start()?)
}

fn line_per_record(
    w: &mut dyn io::Write,
    now: &mut DeferredNow,
    record: &Record,
) -> io::Result<()> {
    write!(
        w,
        "{} {:<5} {}: {}",
        now.format("%Y-%m-%dT%H:%M:%S%.3f"),
        record.level(),
        record.target(),
        record.args()
    )
}

fn terminal(w: &mut dyn io::Write, now: &mut DeferredNow, record: &Record) -> io::Result<()> {
    let painter = style(record.level());
    write!(
        w,
        "{} {}",
        now.format("%H:%M:%S"),
        painter.paint(format!("{:<5} {}", record.level(), record.args()))
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_lines_carry_level_and_target() {
        let mut out = Vec::new();

        line_per_record(
            &mut out,
            &mut DeferredNow::new(),
            &Record::builder()
                .level(log::Level::Warn)
                .target("mountkeeper::process")
                .args(format_args!("helper gone"))
                .build(),
        )
        .unwrap();

        let line = String::from_utf8(out).unwrap();
        assert!(line.ends_with(" WARN  mountkeeper::process: helper gone"));
    }
}
