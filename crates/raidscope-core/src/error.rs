use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Target process is not running")]
    ProcessNotRunning,

    #[error("Failed to read {len} bytes of process memory at address {address:#x}")]
    ReadFailed { address: u64, len: usize },

    #[error("Invalid pointer {value:#x} read from address {address:#x}")]
    BadPointer { address: u64, value: u64 },

    #[error("Remote collection at {address:#x} reports {count} entries (ceiling {ceiling})")]
    CollectionTooLarge { address: u64, count: u32, ceiling: u32 },

    #[error("Malformed remote string at address {0:#x}")]
    BadString(u64),

    #[error("Unexpected {what} value {value}")]
    UnexpectedValue { what: &'static str, value: i64 },

    #[error("Structure integrity check failed: {0}")]
    Integrity(&'static str),

    #[error("Raid has ended")]
    RaidEnded,

    #[error("Game world not found")]
    WorldNotFound,

    #[error("Reference data error: {0}")]
    Data(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error ends the session rather than a single refresh cycle
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::ProcessNotRunning | Error::RaidEnded)
    }
}
