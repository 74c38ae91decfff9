use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Access code expired")]
    Expired,

    #[error("Access code revoked")]
    Revoked,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Too many concurrent viewers for this access code")]
    TooManyConcurrentViewers,

    #[error("No free access code after bounded attempts")]
    ExhaustedCodeSpace,

    #[error("Rate limited, retry in {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("Payload too large: {len} > {max}")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("Reaction not in the allowed emote set: {0}")]
    InvalidReaction(String),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
