// Error taxonomy for the control link
//
// None of these are fatal to the control loop; callers log and carry on.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("Unknown entity id {0}")]
    UnknownEntity(u8),

    #[error("Unknown property id {property} on entity {entity}")]
    UnknownProperty { entity: u8, property: u8 },

    #[error("Payload of {len} bytes is not a whole number of {record}-byte records")]
    Framing { len: usize, record: usize },

    #[error("Outbound buffer full, {dropped} change(s) dropped this flush")]
    Overflow { dropped: usize },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LinkError>;
