use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::FromRow;
use sqlx::PgPool;

use crate::calculation::errors::CalculationError;
use crate::calculation::models::Calculation;
use crate::calculation::models::CalculationId;
use crate::calculation::models::NewCalculation;
use crate::calculation::ports::CalculationRepository;
use crate::user::models::UserId;

#[derive(Debug, FromRow)]
struct CalculationRow {
    id: i64,
    user_id: i64,
    a: f64,
    b: f64,
    operation: String,
    result: f64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CalculationRow> for Calculation {
    type Error = CalculationError;

    fn try_from(row: CalculationRow) -> Result<Self, Self::Error> {
        Ok(Calculation {
            id: CalculationId(row.id),
            user_id: UserId(row.user_id),
            a: row.a,
            b: row.b,
            operation: row.operation.parse()?,
            result: row.result,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub struct PostgresCalculationRepository {
    pool: PgPool,
}

impl PostgresCalculationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn database_error(e: sqlx::Error) -> CalculationError {
    CalculationError::DatabaseError(e.to_string())
}

#[async_trait]
impl CalculationRepository for PostgresCalculationRepository {
    async fn create(&self, calculation: NewCalculation) -> Result<Calculation, CalculationError> {
        let row: CalculationRow = sqlx::query_as(
            r#"
            INSERT INTO calculations (user_id, a, b, operation, result, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING id, user_id, a, b, operation, result, created_at, updated_at
            "#,
        )
        .bind(calculation.user_id.0)
        .bind(calculation.a)
        .bind(calculation.b)
        .bind(calculation.operation.as_str())
        .bind(calculation.result)
        .bind(calculation.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(database_error)?;

        row.try_into()
    }

    async fn find_for_owner(
        &self,
        owner: &UserId,
        id: &CalculationId,
    ) -> Result<Option<Calculation>, CalculationError> {
        let row: Option<CalculationRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, a, b, operation, result, created_at, updated_at
            FROM calculations
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id.0)
        .bind(owner.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        row.map(Calculation::try_from).transpose()
    }

    async fn list_for_owner(&self, owner: &UserId) -> Result<Vec<Calculation>, CalculationError> {
        let rows: Vec<CalculationRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, a, b, operation, result, created_at, updated_at
            FROM calculations
            WHERE user_id = $1
            ORDER BY id
            "#,
        )
        .bind(owner.0)
        .fetch_all(&self.pool)
        .await
        .map_err(database_error)?;

        rows.into_iter().map(Calculation::try_from).collect()
    }

    async fn update(&self, calculation: Calculation) -> Result<Calculation, CalculationError> {
        let result = sqlx::query(
            r#"
            UPDATE calculations
            SET a = $3, b = $4, operation = $5, result = $6, updated_at = $7
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(calculation.id.0)
        .bind(calculation.user_id.0)
        .bind(calculation.a)
        .bind(calculation.b)
        .bind(calculation.operation.as_str())
        .bind(calculation.result)
        .bind(calculation.updated_at)
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        if result.rows_affected() == 0 {
            return Err(CalculationError::NotFound(calculation.id.0));
        }

        Ok(calculation)
    }

    async fn delete_for_owner(
        &self,
        owner: &UserId,
        id: &CalculationId,
    ) -> Result<(), CalculationError> {
        let result = sqlx::query(
            r#"
            DELETE FROM calculations
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id.0)
        .bind(owner.0)
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        if result.rows_affected() == 0 {
            return Err(CalculationError::NotFound(id.0));
        }

        Ok(())
    }
}
