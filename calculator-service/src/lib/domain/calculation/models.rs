use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use chrono::Utc;

use crate::calculation::errors::ComputationError;
use crate::calculation::errors::OperationError;
use crate::user::models::UserId;

/// Stored calculation, owned by one user.
#[derive(Debug, Clone, PartialEq)]
pub struct Calculation {
    pub id: CalculationId,
    pub user_id: UserId,
    pub a: f64,
    pub b: f64,
    pub operation: Operation,
    pub result: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CalculationId(pub i64);

impl fmt::Display for CalculationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Supported arithmetic operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    Modulus,
    Sqrt,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Add => "add",
            Operation::Subtract => "subtract",
            Operation::Multiply => "multiply",
            Operation::Divide => "divide",
            Operation::Power => "power",
            Operation::Modulus => "modulus",
            Operation::Sqrt => "sqrt",
        }
    }

    /// Compute the result for two operands.
    ///
    /// `Sqrt` is unary and ignores `b`. `Modulus` takes the sign of the
    /// divisor (floored remainder).
    ///
    /// # Errors
    /// * `DivisionByZero` - Divide with `b == 0`
    /// * `ModulusByZero` - Modulus with `b == 0`
    /// * `NegativeSquareRoot` - Sqrt of negative `a`
    /// * `NonFiniteResult` - Result overflows or is not a number
    pub fn apply(&self, a: f64, b: f64) -> Result<f64, ComputationError> {
        let result = match self {
            Operation::Add => a + b,
            Operation::Subtract => a - b,
            Operation::Multiply => a * b,
            Operation::Divide => {
                if b == 0.0 {
                    return Err(ComputationError::DivisionByZero);
                }
                a / b
            }
            Operation::Power => a.powf(b),
            Operation::Modulus => {
                if b == 0.0 {
                    return Err(ComputationError::ModulusByZero);
                }
                let remainder = a % b;
                if remainder != 0.0 && (remainder < 0.0) != (b < 0.0) {
                    remainder + b
                } else {
                    remainder
                }
            }
            Operation::Sqrt => {
                if a < 0.0 {
                    return Err(ComputationError::NegativeSquareRoot);
                }
                a.sqrt()
            }
        };

        if result.is_finite() {
            Ok(result)
        } else {
            Err(ComputationError::NonFiniteResult)
        }
    }
}

impl FromStr for Operation {
    type Err = OperationError;

    /// Parse an operation name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "add" => Ok(Operation::Add),
            "subtract" => Ok(Operation::Subtract),
            "multiply" => Ok(Operation::Multiply),
            "divide" => Ok(Operation::Divide),
            "power" => Ok(Operation::Power),
            "modulus" => Ok(Operation::Modulus),
            "sqrt" => Ok(Operation::Sqrt),
            _ => Err(OperationError::Unsupported(s.to_string())),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operands and operation for a new or edited calculation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalculationCommand {
    pub a: f64,
    pub b: f64,
    pub operation: Operation,
}

/// Calculation fields ready to be persisted; the id is assigned by storage.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCalculation {
    pub user_id: UserId,
    pub a: f64,
    pub b: f64,
    pub operation: Operation,
    pub result: f64,
    pub created_at: DateTime<Utc>,
}

/// Aggregate figures over a user's calculation history.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculationStatistics {
    pub total_calculations: usize,
    pub operation_counts: BTreeMap<Operation, usize>,
    pub average_a: f64,
    pub average_b: f64,
    pub most_used_operation: Option<Operation>,
}

impl CalculationStatistics {
    /// Summarize a history given in creation order.
    ///
    /// Ties for the most used operation go to the one used first.
    pub fn from_history(calculations: &[Calculation]) -> Self {
        let total = calculations.len();
        if total == 0 {
            return Self {
                total_calculations: 0,
                operation_counts: BTreeMap::new(),
                average_a: 0.0,
                average_b: 0.0,
                most_used_operation: None,
            };
        }

        let mut operation_counts = BTreeMap::new();
        let mut first_seen = Vec::new();
        for calculation in calculations {
            let count = operation_counts.entry(calculation.operation).or_insert(0);
            if *count == 0 {
                first_seen.push(calculation.operation);
            }
            *count += 1;
        }

        let mut most_used: Option<(Operation, usize)> = None;
        for operation in first_seen {
            let count = operation_counts[&operation];
            if most_used.map_or(true, |(_, best)| count > best) {
                most_used = Some((operation, count));
            }
        }

        let sum_a: f64 = calculations.iter().map(|c| c.a).sum();
        let sum_b: f64 = calculations.iter().map(|c| c.b).sum();

        Self {
            total_calculations: total,
            operation_counts,
            average_a: sum_a / total as f64,
            average_b: sum_b / total as f64,
            most_used_operation: most_used.map(|(operation, _)| operation),
        }
    }
}
