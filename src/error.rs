use std::fmt;

#[derive(Debug)]
pub enum RenderError {
    /// A block could not be placed on an empty page.
    UnplaceableBlock(String),
    /// The record violates a boundary invariant (e.g. no measurement tables).
    InvalidRecord(String),
    InvalidConfiguration(String),
    Io(std::io::Error),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::UnplaceableBlock(message) => {
                write!(f, "block cannot fit on any page: {}", message)
            }
            RenderError::InvalidRecord(message) => {
                write!(f, "invalid report record: {}", message)
            }
            RenderError::InvalidConfiguration(message) => {
                write!(f, "invalid configuration: {}", message)
            }
            RenderError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for RenderError {
    fn from(value: std::io::Error) -> Self {
        RenderError::Io(value)
    }
}
