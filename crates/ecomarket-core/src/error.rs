//! Domain error types.

use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors arising from pure domain logic.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Mode selector outside 1..=6. The active mode is left unchanged.
    #[error("Invalid dispatch mode {0}: expected 1..=6")]
    InvalidDispatchMode(u8),

    /// An event failed structural validation at a boundary.
    #[error("Invalid sale event: {0}")]
    InvalidEvent(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DispatchMode;

    #[test]
    fn test_invalid_mode_message() {
        let err = DispatchMode::try_from(9).unwrap_err();
        assert!(matches!(err, CoreError::InvalidDispatchMode(9)));
        assert!(err.to_string().contains("1..=6"));
    }
}
