use crate::{delegate::MountDelegate, error::*, params::*};

const REQUIRED: [&str; 3] = [keys::VOLUME_NAME, keys::MOUNT_PATH, keys::UUID];

/// `params` with delegate and generic defaults merged in, plus any keys the
/// delegate derives from them.
pub fn implied_parameters(params: &Parameters, delegate: &dyn MountDelegate) -> Parameters {
    let merged = params.with_defaults(&delegate.default_parameters());
    let derived = delegate.derived_parameters(&merged);
    merged.with_defaults(&derived)
}

pub fn validate(params: &Parameters, delegate: &dyn MountDelegate) -> Result<()> {
    let implied = implied_parameters(params, delegate);

    delegate.validate(&implied)?;

    match REQUIRED.iter().find(|key| !implied.contains(key)) {
        Some(missing) => Err(Error::MissingParameter(missing.to_string())),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delegate::testing::FakeDelegate;

    fn valid() -> Parameters {
        [
            (keys::VOLUME_NAME, "vol"),
            (keys::MOUNT_PATH, "/tmp/vol"),
            (keys::UUID, "00000000-0000-0000-0000-000000000000"),
        ]
        .into_iter()
        .collect()
    }

    fn without(missing: &[&str]) -> Parameters {
        let mut params = valid();
        for key in missing {
            params.remove(key);
        }
        params
    }

    #[test]
    fn accepts_complete_set() {
        assert_eq!(validate(&valid(), &FakeDelegate::default()), Ok(()));
    }

    #[test]
    fn reports_missing_mount_path() {
        assert_eq!(
            validate(&without(&[keys::MOUNT_PATH]), &FakeDelegate::default()),
            Err(Error::MissingParameter(keys::MOUNT_PATH.to_string()))
        );
    }

    #[test]
    fn reports_first_missing_key() {
        let delegate = FakeDelegate::default();

        assert_eq!(
            validate(&without(&[keys::UUID, keys::VOLUME_NAME]), &delegate),
            Err(Error::MissingParameter(keys::VOLUME_NAME.to_string()))
        );
        assert_eq!(
            validate(&without(&[keys::UUID, keys::MOUNT_PATH]), &delegate),
            Err(Error::MissingParameter(keys::MOUNT_PATH.to_string()))
        );
        assert_eq!(
            validate(&without(&[keys::UUID]), &delegate),
            Err(Error::MissingParameter(keys::UUID.to_string()))
        );
    }

    #[test]
    fn delegate_rejection_wins() {
        let delegate = FakeDelegate::default();
        let rejection = Error::InvalidParameterValue {
            key: "server".to_string(),
            message: "bad".to_string(),
        };
        *delegate.reject.lock().unwrap() = Some(rejection.clone());

        assert_eq!(
            validate(&without(&[keys::MOUNT_PATH]), &delegate),
            Err(rejection)
        );
    }

    #[test]
    fn derived_keys_count_as_present() {
        let params = implied_parameters(&valid(), &FakeDelegate::default());

        assert_eq!(params.str(keys::NAME), Some("vol"));
        assert_eq!(params.str("server"), Some("example.com"));
    }

    #[test]
    fn caller_keys_beat_derived_ones() {
        let mut params = valid();
        params.set(keys::NAME, "mine");

        let implied = implied_parameters(&params, &FakeDelegate::default());

        assert_eq!(implied.str(keys::NAME), Some("mine"));
    }
}
