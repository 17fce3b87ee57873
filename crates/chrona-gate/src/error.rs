/// Errors that can occur during gate evaluation.
///
/// A denial is not an error; it is reported through
/// [`GateDecision::Denied`](crate::GateDecision::Denied).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    /// The request lacks information a stage needs.
    #[error("incomplete gate request: {0}")]
    MissingContext(String),

    /// A stage returned an unexpected error.
    #[error("stage error in '{stage}': {message}")]
    StageError { stage: String, message: String },
}

impl GateError {
    pub fn stage(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StageError {
            stage: stage.into(),
            message: message.into(),
        }
    }
}
