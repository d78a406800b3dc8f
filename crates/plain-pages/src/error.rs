//! Error types for page layout
//!
//! Layout only fails when the requested geometry cannot hold a page of text.
//! Content itself never produces an error: anything that is not printable is
//! replaced during encoding.

use std::fmt;

/// Error type for paginated text layout.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutError {
    /// A dimension is negative, zero where it must not be, or not finite
    InvalidGeometry(&'static str),
    /// The text area cannot hold the minimum number of columns or rows
    PageTooSmall {
        /// Character columns that fit between the margins
        columns: usize,
        /// Text rows that fit between the margins
        rows: usize,
    },
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutError::InvalidGeometry(reason) => {
                write!(f, "invalid page geometry: {}", reason)
            }
            LayoutError::PageTooSmall { columns, rows } => {
                write!(
                    f,
                    "page too small for text layout: {} columns x {} rows",
                    columns, rows
                )
            }
        }
    }
}

impl std::error::Error for LayoutError {}
