use std::fmt;

#[derive(Debug)]
pub enum ContextError {
    /// A referenced context reappeared in its own resolution chain.
    RecursiveContextInclusion { identifier: String },
    /// A loaded reference was not an object carrying an `@context` entry.
    InvalidRemoteContext { identifier: String },
    /// A term declaration that cannot be honored.
    InvalidTermDefinition { term: String, message: String },
    /// The source loader failed for a referenced context.
    Load {
        identifier: String,
        source: Box<dyn std::error::Error>,
    },
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextError::RecursiveContextInclusion { identifier } => {
                write!(f, "recursive context inclusion: {}", identifier)
            }
            ContextError::InvalidRemoteContext { identifier } => {
                write!(
                    f,
                    "invalid remote context {}: not an object with an @context entry",
                    identifier
                )
            }
            ContextError::InvalidTermDefinition { term, message } => {
                write!(f, "invalid term definition '{}': {}", term, message)
            }
            ContextError::Load { identifier, source } => {
                write!(f, "failed to load context source {}: {}", identifier, source)
            }
        }
    }
}

impl std::error::Error for ContextError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ContextError::Load { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}
