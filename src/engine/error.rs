#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Hour outside `0..=23`, a reversed range, picker misuse, or a local time
    /// that does not exist.
    InvalidArgument(String),
    /// Submission attempted with no ranges on any day.
    EmptySelection,
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            EngineError::EmptySelection => write!(f, "no time ranges selected"),
        }
    }
}

impl std::error::Error for EngineError {}
