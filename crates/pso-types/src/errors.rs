use thiserror::Error;

/// Main error type for the PSO optimization tool
#[derive(Error, Debug)]
pub enum PsoError {
    #[error("Validation error: bounds pair {index} is invalid (min {min}, max {max}): {reason}")]
    Validation {
        index: usize,
        min: f64,
        max: f64,
        reason: String,
    },

    #[error("Validation error: expected 4 bounds pairs, got {actual}")]
    WrongArity { actual: usize },

    #[error("Validation error: {0}")]
    Precondition(String),

    #[error("Engine error: {message}")]
    Engine { message: String },

    #[error("Parse error in artifact {artifact}: {message}")]
    Parse { artifact: String, message: String },

    #[error("Process error: {message}")]
    Process {
        exit_code: Option<i32>,
        message: String,
    },

    #[error("Payload parse error: {0}")]
    PayloadParse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PsoError {
    pub fn engine(message: impl Into<String>) -> Self {
        Self::Engine {
            message: message.into(),
        }
    }

    pub fn parse(artifact: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            artifact: artifact.into(),
            message: message.into(),
        }
    }

    /// True for errors raised before any process or engine session is started.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. } | Self::WrongArity { .. } | Self::Precondition(_)
        )
    }
}

/// Result type alias for PSO tool operations
pub type PsoResult<T> = Result<T, PsoError>;

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::PsoError::Config(format!($($arg)*))
    };
}
