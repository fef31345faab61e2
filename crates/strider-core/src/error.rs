use thiserror::Error;

/// Top-level error type for the strider stack.
#[derive(Debug, Error)]
pub enum StriderError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),
}

/// Configuration errors.
///
/// Only structural failures (unreadable/unparseable config) are surfaced as
/// errors. Out-of-range *values* are repaired in place by `sanitize` with a
/// warning, so a running rig never dies on a bad tuning number.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Rig has no legs")]
    NoLegs,

    #[error("Leg '{leg}' references unknown bone '{bone}'")]
    UnknownBone { leg: String, bone: String },
}

/// Chain construction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("Chain has no joints")]
    Empty,

    #[error("End effector bone {0} is also a constrained joint")]
    EffectorIsJoint(usize),
}
