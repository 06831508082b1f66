use crate::clp::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Custom(String),
    #[error("The graph has no vertex with index {0}")]
    GraphVertexNotFound(usize),
    #[error("The graph has no edge from {0} to {1}")]
    GraphEdgeNotFound(usize, usize),
    #[error("The control flow graph has no entry block")]
    NoEntry,
    #[error("Address {0} is not a constant")]
    NonConstantAddress(Value),
    #[error("Address {0} cannot designate a register or a memory cell")]
    InvalidAddress(Value),
    #[error("Register {0} is out of the platform register range")]
    RegisterOutOfRange(i32),
    #[error("Json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<&str> for Error {
    fn from(s: &str) -> Error {
        Error::Custom(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Error {
        Error::Custom(s)
    }
}
