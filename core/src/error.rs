use thiserror::Error;

/// Errors the recommendation core reports to its caller. Sparse data (unknown
/// games, empty genres, missing ratings) never ends up here.
#[derive(Debug, Error)]
pub enum RecError {
    #[error("invalid parameter `{name}`: {value} (must be >= 0)")]
    NegativeCount { name: &'static str, value: i64 },
    #[error("snapshot version {found} is not supported (expected {expected})")]
    SnapshotVersion { found: u32, expected: u32 },
}

pub type RecResult<T> = Result<T, RecError>;
