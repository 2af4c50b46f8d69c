//! Error type shared by the world model, registries and persistence.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Lookup of an attribute that the store does not hold.
    #[error("unknown attribute '{0}'")]
    UnknownAttribute(String),

    /// Lookup of a template by id or name that the registry does not hold.
    #[error("unknown {kind} '{key}'")]
    UnknownEntity { kind: &'static str, key: String },

    /// A value was read or written with the wrong kind.
    #[error("attribute '{name}' has an invalid type: {reason}")]
    InvalidType { name: String, reason: String },

    /// A name was used both as a valued variable and as a property.
    #[error("'{0}' cannot be both a variable and a property")]
    NameConflict(String),

    #[error("malformed config at line {line}: {reason}")]
    MalformedConfig { line: usize, reason: String },

    #[error("coordinates ({x}, {y}) are outside the map")]
    OutOfBounds { x: i64, y: i64 },

    #[error("not enough xp: need {need}, have {have}")]
    InsufficientXp { need: i64, have: i64 },

    #[error("not enough '{item}': need {need}, have {have}")]
    InsufficientItems { item: String, need: u32, have: u32 },

    #[error("no free tile to spawn on")]
    NoSpawnPoint,

    #[error("player {0} is not connected")]
    UnknownPlayer(usize),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Error::MalformedConfig {
            line,
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_type(name: &str, reason: impl Into<String>) -> Self {
        Error::InvalidType {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}
