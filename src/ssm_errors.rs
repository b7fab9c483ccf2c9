use std::fmt;

/// Errors raised by the parameter store engine.
///
/// Multi-step operations (chunked delete, tree copy, move) are best effort:
/// whatever was applied before an error is returned stays applied.
#[derive(Debug, Fail, PartialEq)]
pub enum SSMError {
    /// Path is neither a parameter nor a prefix with parameters under it
    NotFound(String),
    /// Single-key lookup reported the parameter as missing
    ParameterNotFound(String),
    /// Prefix target given to an operation that needs recursion
    AmbiguousRecursion(String),
    /// Source/destination combination that copy cannot service
    InvalidClassification { src: String, dst: String },
    /// Names rejected by one or more batched deletes
    BatchFailure(Vec<String>),
    /// Error surfaced by the remote service, passed through unmodified
    Upstream { operation: &'static str, reason: String },
    /// Malformed command, option or region given by the user
    InvalidInput(String),
}

pub type SSMResult<T> = Result<T, SSMError>;

impl SSMError {
    pub fn upstream<E: fmt::Display>(operation: &'static str, err: E) -> Self {
        SSMError::Upstream {
            operation,
            reason: err.to_string(),
        }
    }
}

impl fmt::Display for SSMError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SSMError::NotFound(path) => write!(f, "No path or parameter {} was found", path),
            SSMError::ParameterNotFound(name) => write!(f, "Parameter {} not found", name),
            SSMError::AmbiguousRecursion(path) => {
                write!(f, "{} is a path but recursion was not requested. Use -R", path)
            }
            SSMError::InvalidClassification { src, dst } => {
                write!(f, "Cannot copy path ({}) to parameter ({})", src, dst)
            }
            SSMError::BatchFailure(names) => {
                write!(f, "Could not delete invalid parameters {}", names.join(","))
            }
            SSMError::Upstream { operation, reason } => write!(f, "{}: {}", operation, reason),
            SSMError::InvalidInput(reason) => write!(f, "{}", reason),
        }
    }
}
