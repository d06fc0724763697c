//! Error and Result types for the response composer.
//!
//! The request parser never returns an error type of its own: malformed
//! input is reported as the terminal [`crate::request::ParserState::InvalidRequest`]
//! state, observed through `state()` rather than thrown. Only the composer,
//! which can be misused by calling its operations out of order or by
//! overflowing its fixed buffer, needs an error enum.

use core::fmt;

/// Failure returned by a [`crate::response::ResponseComposer`] operation.
///
/// Both variants are recoverable: the caller may retry with a larger
/// buffer, a smaller header, or by calling operations in the right order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeError {
    /// The operation is not valid in the composer's current state (e.g.
    /// calling `add_header` before `add_status`, or after `end_headers`).
    BadState,
    /// Writing this header would overflow the buffer once the 4-byte
    /// reserve for the final CRLF CRLF terminator is accounted for.
    InsufficientCapacity,
}

impl fmt::Display for ComposeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComposeError::BadState => f.write_str("operation invalid in current composer state"),
            ComposeError::InsufficientCapacity => {
                f.write_str("insufficient buffer capacity to write header and reserve terminator")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ComposeError {}

/// Result type returned by fallible composer operations.
pub type Result<T> = core::result::Result<T, ComposeError>;
