use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::calculation::errors::CalculationError;
use crate::calculation::models::Calculation;
use crate::calculation::models::CalculationCommand;
use crate::calculation::models::CalculationId;
use crate::calculation::models::CalculationStatistics;
use crate::calculation::models::NewCalculation;
use crate::calculation::ports::CalculationRepository;
use crate::calculation::ports::CalculationServicePort;
use crate::user::models::UserId;

/// Domain service implementation for calculation operations.
pub struct CalculationService<CR>
where
    CR: CalculationRepository,
{
    repository: Arc<CR>,
}

impl<CR> CalculationService<CR>
where
    CR: CalculationRepository,
{
    pub fn new(repository: Arc<CR>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl<CR> CalculationServicePort for CalculationService<CR>
where
    CR: CalculationRepository,
{
    async fn browse(&self, owner: &UserId) -> Result<Vec<Calculation>, CalculationError> {
        self.repository.list_for_owner(owner).await
    }

    async fn read(
        &self,
        owner: &UserId,
        id: &CalculationId,
    ) -> Result<Calculation, CalculationError> {
        self.repository
            .find_for_owner(owner, id)
            .await?
            .ok_or(CalculationError::NotFound(id.0))
    }

    async fn add(
        &self,
        owner: &UserId,
        command: CalculationCommand,
    ) -> Result<Calculation, CalculationError> {
        let result = command.operation.apply(command.a, command.b)?;

        let calculation = self
            .repository
            .create(NewCalculation {
                user_id: *owner,
                a: command.a,
                b: command.b,
                operation: command.operation,
                result,
                created_at: Utc::now(),
            })
            .await?;

        tracing::debug!(
            user_id = %owner,
            calculation_id = %calculation.id,
            operation = %calculation.operation,
            "Calculation stored"
        );

        Ok(calculation)
    }

    async fn edit(
        &self,
        owner: &UserId,
        id: &CalculationId,
        command: CalculationCommand,
    ) -> Result<Calculation, CalculationError> {
        let mut calculation = self.read(owner, id).await?;

        calculation.result = command.operation.apply(command.a, command.b)?;
        calculation.a = command.a;
        calculation.b = command.b;
        calculation.operation = command.operation;
        calculation.updated_at = Utc::now();

        self.repository.update(calculation).await
    }

    async fn delete(&self, owner: &UserId, id: &CalculationId) -> Result<(), CalculationError> {
        self.repository.delete_for_owner(owner, id).await
    }

    async fn statistics(&self, owner: &UserId) -> Result<CalculationStatistics, CalculationError> {
        let history = self.repository.list_for_owner(owner).await?;
        Ok(CalculationStatistics::from_history(&history))
    }
}
