use std::{
    error::Error,
    fmt::{Display, Formatter},
};

/// Crate wide result type.
pub type CropSatResult<T> = Result<T, Box<dyn Error + Send + Sync + 'static>>;

/// The remote engine rejected or failed a request.
#[derive(Debug, Clone)]
pub struct EngineError {
    /// The error code reported by the engine, or the HTTP status when none was reported.
    pub code: u64,
    pub message: String,
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter) -> Result<(), std::fmt::Error> {
        write!(f, "engine error {}: {}", self.code, self.message)
    }
}

impl Error for EngineError {}

/// Failure to establish or refresh an authenticated session.
#[derive(Debug, Clone)]
pub struct AuthError {
    pub message: String,
}

impl Display for AuthError {
    fn fmt(&self, f: &mut Formatter) -> Result<(), std::fmt::Error> {
        write!(f, "authentication failed: {}", self.message)
    }
}

impl Error for AuthError {}
