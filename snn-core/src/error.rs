use core::fmt;

use thiserror::Error;

/// Kind of named entity held by a [`Network`](crate::Network).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Population,
    Connection,
    Monitor,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Population => write!(f, "population"),
            EntityKind::Connection => write!(f, "connection"),
            EntityKind::Monitor => write!(f, "monitor"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SnnError {
    /// Missing or invalid parameter key at construction time
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Vector/matrix dimension mismatch
    #[error("shape mismatch for {what}: expected {expected:?}, got {actual:?}")]
    Shape {
        what: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("{kind} '{name}' already exists")]
    DuplicateName { kind: EntityKind, name: String },

    /// Name that does not resolve to a registered entity
    #[error("{kind} '{name}' is not registered")]
    Reference { kind: EntityKind, name: String },

    /// Population that cannot be removed while a connection still uses it
    #[error("population '{population}' is still used by connection '{connection}'")]
    InUse { population: String, connection: String },
}

impl SnnError {
    pub(crate) fn shape(what: impl Into<String>, expected: &[usize], actual: &[usize]) -> Self {
        SnnError::Shape {
            what: what.into(),
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }

    pub(crate) fn reference(kind: EntityKind, name: impl Into<String>) -> Self {
        SnnError::Reference { kind, name: name.into() }
    }

    pub(crate) fn duplicate(kind: EntityKind, name: impl Into<String>) -> Self {
        SnnError::DuplicateName { kind, name: name.into() }
    }
}

pub type SnnResult<T, E = SnnError> = core::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            format!("{}", SnnError::Configuration("missing key 'Uth'".into())),
            "configuration error: missing key 'Uth'"
        );
        assert_eq!(
            format!("{}", SnnError::shape("weight", &[4, 3], &[3, 4])),
            "shape mismatch for weight: expected [4, 3], got [3, 4]"
        );
        assert_eq!(
            format!("{}", SnnError::duplicate(EntityKind::Population, "in")),
            "population 'in' already exists"
        );
        assert_eq!(
            format!("{}", SnnError::reference(EntityKind::Monitor, "m")),
            "monitor 'm' is not registered"
        );
        assert_eq!(
            format!(
                "{}",
                SnnError::InUse { population: "in".into(), connection: "in->out".into() }
            ),
            "population 'in' is still used by connection 'in->out'"
        );
    }

    #[test]
    fn result_round_trip() {
        fn may_fail(ok: bool) -> SnnResult<u32> {
            if ok { Ok(7) } else { Err(SnnError::Configuration("fail".into())) }
        }
        assert_eq!(may_fail(true).unwrap(), 7);
        assert!(may_fail(false).is_err());
    }
}
