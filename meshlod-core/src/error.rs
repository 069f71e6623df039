//! Error types for meshlod

use thiserror::Error;

/// Main error type for meshlod operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A caller contract was violated (bad stride, index count, target, buffer size)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A working buffer could not be reserved
    #[error("Out of memory: failed to reserve {count} elements for {what}")]
    OutOfMemory { what: &'static str, count: usize },

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Result type alias for meshlod operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }
}

/// Reserve an empty vector with room for exactly `count` elements.
pub fn try_with_capacity<T>(what: &'static str, count: usize) -> Result<Vec<T>> {
    let mut data = Vec::new();
    data.try_reserve_exact(count)
        .map_err(|_| Error::OutOfMemory { what, count })?;
    Ok(data)
}

/// Allocate a vector of `count` copies of `value`, reporting allocation failure as an error.
pub fn try_filled<T: Clone>(what: &'static str, count: usize, value: T) -> Result<Vec<T>> {
    let mut data = try_with_capacity(what, count)?;
    data.resize(count, value);
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let e = Error::invalid_argument("index count 4 is not a multiple of 3");
        assert_eq!(e.to_string(), "Invalid argument: index count 4 is not a multiple of 3");

        let e = Error::OutOfMemory { what: "quadrics", count: 12 };
        assert_eq!(e.to_string(), "Out of memory: failed to reserve 12 elements for quadrics");
    }

    #[test]
    fn test_try_filled() {
        let data = try_filled("remap", 5, 7u32).unwrap();
        assert_eq!(data, vec![7; 5]);
        assert!(try_filled("remap", 0, 0u8).unwrap().is_empty());
    }

    #[test]
    fn test_try_with_capacity() {
        let data: Vec<u32> = try_with_capacity("collapses", 9).unwrap();
        assert!(data.is_empty());
        assert!(data.capacity() >= 9);
    }

    #[test]
    fn test_try_filled_reports_capacity_overflow() {
        let result = try_filled("huge", usize::MAX, 0u64);
        assert_eq!(result, Err(Error::OutOfMemory { what: "huge", count: usize::MAX }));
    }
}
