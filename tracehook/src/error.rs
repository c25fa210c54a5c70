use thiserror::Error;

/// Failures reported by the tracer registry.
///
/// The discriminants are the numeric codes callers poll through
/// [`last_error`](crate::Registry::last_error).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(i32)]
pub enum TracerError {
    /// Registration asked for a granularity that is neither instruction nor block.
    #[error("unknown trace granularity")]
    InvalidGranularity = 1,
    /// No tracer with the requested id exists.
    #[error("no tracer registered with that id")]
    InvalidId = 2,
}

impl TracerError {
    /// Stable numeric code for this error.
    #[must_use]
    pub const fn as_code(self) -> i32 {
        self as i32
    }

    /// Maps a numeric code back to an error kind.
    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::InvalidGranularity),
            2 => Some(Self::InvalidId),
            _ => None,
        }
    }
}
