use thiserror::Error;

/// Error for operation name parsing
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OperationError {
    #[error("Invalid operation type '{0}'. Must be one of: add, subtract, multiply, divide, power, modulus, sqrt")]
    Unsupported(String),
}

/// Arithmetic failures while computing a result
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ComputationError {
    #[error("Cannot divide by zero")]
    DivisionByZero,

    #[error("Cannot perform modulus with zero")]
    ModulusByZero,

    #[error("Cannot calculate square root of negative number")]
    NegativeSquareRoot,

    #[error("Result is not a finite number")]
    NonFiniteResult,
}

/// Top-level error for calculation operations
#[derive(Debug, Clone, Error)]
pub enum CalculationError {
    #[error(transparent)]
    InvalidOperation(#[from] OperationError),

    #[error(transparent)]
    Computation(#[from] ComputationError),

    #[error("Calculation not found: {0}")]
    NotFound(i64),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
