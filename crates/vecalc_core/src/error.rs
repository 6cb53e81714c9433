use thiserror::Error;

/// Errors raised by the calculus helpers.
#[derive(Debug, Error)]
pub enum CalculusError {
    /// Arguments have the wrong shape, e.g. vectors of different lengths.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A quantity that must be divided by is zero (zero-length vector, 1/0).
    #[error("Division by zero: {0}")]
    DivisionByZero(String),

    #[error("Parse error: {0}")]
    Parse(String),

    /// An expression still references a symbol with no bound value.
    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("Quadrature failed: {0}")]
    Quadrature(String),

    #[error("Solver failed: {0}")]
    Solver(String),
}

pub type Result<T> = std::result::Result<T, CalculusError>;

impl From<anyhow::Error> for CalculusError {
    fn from(err: anyhow::Error) -> Self {
        CalculusError::Solver(format!("{err:#}"))
    }
}

impl CalculusError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        CalculusError::InvalidArgument(message.into())
    }
}
