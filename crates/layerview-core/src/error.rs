//! Error handling for LayerView
//!
//! Provides error types for the layers of the viewer:
//! - G-Code errors (loading/parsing an instruction source)
//! - Render errors (GPU backend failures)
//!
//! All error types use `thiserror` for ergonomic error handling.
//! Degenerate input (empty files, zero-length segments) is never an error;
//! it yields empty feature lists instead.

use thiserror::Error;

/// G-Code error type
///
/// Represents errors raised while loading G-Code into an instruction source.
#[derive(Error, Debug, Clone)]
pub enum GcodeError {
    /// The file could not be read
    #[error("File error: {reason}")]
    FileError {
        /// The reason for the file error.
        reason: String,
    },
}

/// Render error type
///
/// Failures reported by a GPU backend. These are not recovered inside the
/// renderer and propagate to the host.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// A buffer object could not be created
    #[error("Buffer creation error: {0}")]
    BufferCreation(String),

    /// A shader failed to compile or link
    #[error("Shader error: {0}")]
    Shader(String),

    /// A handle was used that the backend does not know about
    #[error("Unknown buffer handle {0}")]
    UnknownHandle(u32),

    /// Generic backend error
    #[error("Render backend error: {0}")]
    Backend(String),
}

/// Main error type for LayerView
///
/// A unified error type that can represent any error from all layers.
#[derive(Error, Debug)]
pub enum Error {
    /// G-Code error
    #[error(transparent)]
    Gcode(#[from] GcodeError),

    /// Render error
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Check if this is a G-Code error
    pub fn is_gcode_error(&self) -> bool {
        matches!(self, Error::Gcode(_))
    }

    /// Check if this is a render error
    pub fn is_render_error(&self) -> bool {
        matches!(self, Error::Render(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_error_converts() {
        let err: Error = RenderError::BufferCreation("out of handles".into()).into();
        assert!(err.is_render_error());
        assert_eq!(err.to_string(), "Buffer creation error: out of handles");
    }

    #[test]
    fn test_gcode_error_display() {
        let err = GcodeError::FileError {
            reason: "part.gcode: permission denied".into(),
        };
        assert_eq!(err.to_string(), "File error: part.gcode: permission denied");
        assert!(Error::from(err).is_gcode_error());
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
