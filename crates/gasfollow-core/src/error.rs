//! Follower error types.

use thiserror::Error;

/// Errors surfaced by the follower library.
///
/// None of these reach the host at runtime: the controller and sampler log
/// and carry on. They are returned from configuration loading and from
/// the pure bound derivation.
#[derive(Debug, Error)]
pub enum FollowError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("desired gas limit {0} does not fit in u64")]
    BoundsOverflow(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type FollowResult<T> = Result<T, FollowError>;
