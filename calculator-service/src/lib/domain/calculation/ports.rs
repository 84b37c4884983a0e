use async_trait::async_trait;

use crate::calculation::errors::CalculationError;
use crate::calculation::models::Calculation;
use crate::calculation::models::CalculationCommand;
use crate::calculation::models::CalculationId;
use crate::calculation::models::CalculationStatistics;
use crate::calculation::models::NewCalculation;
use crate::user::models::UserId;

/// Port for calculation operations.
///
/// Every operation is scoped to the owning user; another user's calculation is
/// reported as not found.
#[async_trait]
pub trait CalculationServicePort: Send + Sync + 'static {
    /// List the owner's calculations, oldest first.
    async fn browse(&self, owner: &UserId) -> Result<Vec<Calculation>, CalculationError>;

    /// # Errors
    /// * `NotFound` - No such calculation for this owner
    async fn read(
        &self,
        owner: &UserId,
        id: &CalculationId,
    ) -> Result<Calculation, CalculationError>;

    /// Compute and store a new calculation.
    ///
    /// # Errors
    /// * `Computation` - Operands are invalid for the operation
    async fn add(
        &self,
        owner: &UserId,
        command: CalculationCommand,
    ) -> Result<Calculation, CalculationError>;

    /// Replace operands and operation, recomputing the result.
    ///
    /// # Errors
    /// * `NotFound` - No such calculation for this owner
    /// * `Computation` - Operands are invalid for the operation
    async fn edit(
        &self,
        owner: &UserId,
        id: &CalculationId,
        command: CalculationCommand,
    ) -> Result<Calculation, CalculationError>;

    /// # Errors
    /// * `NotFound` - No such calculation for this owner
    async fn delete(&self, owner: &UserId, id: &CalculationId) -> Result<(), CalculationError>;

    /// Summarize the owner's history.
    async fn statistics(&self, owner: &UserId) -> Result<CalculationStatistics, CalculationError>;
}

/// Persistence operations for calculations.
#[async_trait]
pub trait CalculationRepository: Send + Sync + 'static {
    /// Persist a calculation and return it with its assigned id.
    async fn create(&self, calculation: NewCalculation) -> Result<Calculation, CalculationError>;

    /// Retrieve a calculation owned by `owner`.
    ///
    /// # Returns
    /// Optional calculation (None if missing or owned by someone else)
    async fn find_for_owner(
        &self,
        owner: &UserId,
        id: &CalculationId,
    ) -> Result<Option<Calculation>, CalculationError>;

    /// Retrieve all calculations owned by `owner`, ordered by id.
    async fn list_for_owner(&self, owner: &UserId) -> Result<Vec<Calculation>, CalculationError>;

    /// Store new operands, operation, result and `updated_at`.
    ///
    /// # Errors
    /// * `NotFound` - Calculation does not exist for its owner
    async fn update(&self, calculation: Calculation) -> Result<Calculation, CalculationError>;

    /// # Errors
    /// * `NotFound` - Calculation does not exist for this owner
    async fn delete_for_owner(
        &self,
        owner: &UserId,
        id: &CalculationId,
    ) -> Result<(), CalculationError>;
}
