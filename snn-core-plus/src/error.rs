use std::path::PathBuf;

use snn_core::SnnError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlusError {
    /// Engine error raised while building or driving a network
    #[error(transparent)]
    Core(#[from] SnnError),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed TOML
    #[error("invalid network description: {0}")]
    Toml(#[from] toml::de::Error),

    /// Well-formed TOML that does not describe a valid network
    #[error("invalid network description: {0}")]
    Invalid(String),
}

pub type PlusResult<T, E = PlusError> = core::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use snn_core::EntityKind;

    #[test]
    fn display_messages() {
        assert_eq!(
            format!("{}", PlusError::Invalid("dt must be positive".into())),
            "invalid network description: dt must be positive"
        );
        let core: PlusError = SnnError::Reference { kind: EntityKind::Population, name: "in".into() }.into();
        assert_eq!(format!("{}", core), "population 'in' is not registered");
        let io = PlusError::Io {
            path: PathBuf::from("net.toml"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        assert_eq!(format!("{}", io), "failed to read net.toml: no such file");
    }

    #[test]
    fn result_round_trip() {
        fn may_fail(ok: bool) -> PlusResult<u32> {
            if ok { Ok(7) } else { Err(PlusError::Invalid("fail".into())) }
        }
        assert_eq!(may_fail(true).unwrap(), 7);
        assert!(may_fail(false).is_err());
    }
}
