// src/db/counting_repo.rs

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::store::CountingStore,
    models::counting::{Counting, CountingPatch, CountingStatus, CountedItem, NewCounting},
};

#[derive(Clone)]
pub struct CountingRepository {
    pool: PgPool,
}

impl CountingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CountingStore for CountingRepository {
    // ---
    // Criação (transacional: contador + contagem + setores)
    // ---
    async fn create_counting(&self, new: NewCounting) -> Result<Counting, AppError> {
        let mut tx = self.pool.begin().await?;

        // 1. Próximo sequencial do tenant. O UPSERT incrementa de forma
        // atômica, então criações concorrentes nunca repetem valor.
        let next: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO counting_counters (tenant_id, last_value)
            VALUES ($1, 1)
            ON CONFLICT (tenant_id)
            DO UPDATE SET last_value = counting_counters.last_value + 1
            RETURNING last_value
            "#,
        )
        .bind(new.tenant_id)
        .fetch_one(&mut *tx)
        .await?;

        let internal_id = format!("{:03}", next);

        // 2. Cria a contagem já com o deadline de fallback resolvido pelo service
        let counting = sqlx::query_as::<_, Counting>(
            r#"
            INSERT INTO countings (
                tenant_id, internal_id, employee_name, whatsapp_number,
                scheduled_date, scheduled_time, expires_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(new.tenant_id)
        .bind(&internal_id)
        .bind(&new.employee_name)
        .bind(&new.whatsapp_number)
        .bind(new.scheduled_date)
        .bind(new.scheduled_time)
        .bind(new.expires_at)
        .fetch_one(&mut *tx)
        .await?;

        // 3. Escopo de setores como relação de verdade (counting_id, sector_id)
        sqlx::query(
            r#"
            INSERT INTO counting_sectors (counting_id, sector_id)
            SELECT $1, UNNEST($2::uuid[])
            "#,
        )
        .bind(counting.id)
        .bind(&new.sector_ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(counting)
    }

    // ---
    // Leituras
    // ---
    async fn get_counting(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Counting>, AppError> {
        let counting = sqlx::query_as::<_, Counting>(
            "SELECT * FROM countings WHERE tenant_id = $1 AND id = $2",
        )
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(counting)
    }

    async fn get_counting_by_token(&self, token: Uuid) -> Result<Option<Counting>, AppError> {
        let counting =
            sqlx::query_as::<_, Counting>("SELECT * FROM countings WHERE public_token = $1")
                .bind(token)
                .fetch_optional(&self.pool)
                .await?;
        Ok(counting)
    }

    async fn list_countings(&self, tenant_id: Uuid) -> Result<Vec<Counting>, AppError> {
        let countings = sqlx::query_as::<_, Counting>(
            "SELECT * FROM countings WHERE tenant_id = $1 ORDER BY internal_id DESC",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(countings)
    }

    async fn list_active_countings(
        &self,
        tenant_id: Option<Uuid>,
    ) -> Result<Vec<Counting>, AppError> {
        let countings = sqlx::query_as::<_, Counting>(
            r#"
            SELECT * FROM countings
            WHERE ($1::uuid IS NULL OR tenant_id = $1)
              AND status = ANY(ARRAY['pending', 'in_progress']::counting_status[])
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(countings)
    }

    // ---
    // Transições (escrita condicional)
    // ---
    // Uma única UPDATE com pré-condição de status. Zero linhas afetadas
    // significa que a pré-condição falhou; o chamador decide o erro.
    async fn transition_counting(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        expected: &[CountingStatus],
        patch: CountingPatch,
    ) -> Result<Option<Counting>, AppError> {
        let expected: Vec<CountingStatus> = expected.to_vec();

        let counting = sqlx::query_as::<_, Counting>(
            r#"
            UPDATE countings SET
                status         = COALESCE($4, status),
                started_at     = COALESCE($5, started_at),
                completed_at   = COALESCE($6, completed_at),
                approved_at    = COALESCE($7, approved_at),
                expires_at     = COALESCE($8, expires_at),
                scheduled_date = COALESCE($9, scheduled_date),
                scheduled_time = COALESCE($10, scheduled_time)
            WHERE tenant_id = $1 AND id = $2 AND status = ANY($3)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .bind(&expected)
        .bind(patch.status)
        .bind(patch.started_at)
        .bind(patch.completed_at)
        .bind(patch.approved_at)
        .bind(patch.expires_at)
        .bind(patch.scheduled_date)
        .bind(patch.scheduled_time)
        .fetch_optional(&self.pool)
        .await?;

        Ok(counting)
    }

    async fn list_counting_sectors(&self, counting_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT sector_id FROM counting_sectors WHERE counting_id = $1",
        )
        .bind(counting_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    // ---
    // Itens contados
    // ---
    async fn upsert_counted_item(
        &self,
        counting_id: Uuid,
        product_id: Uuid,
        counted_quantity: Decimal,
        notes: Option<String>,
        counted_by: Option<String>,
    ) -> Result<CountedItem, AppError> {
        // Upsert por (counting_id, product_id): reenvio do operador de campo
        // sobrescreve a quantidade anterior (a última escrita vence).
        let item = sqlx::query_as::<_, CountedItem>(
            r#"
            INSERT INTO counted_items (counting_id, product_id, counted_quantity, notes, counted_by)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (counting_id, product_id)
            DO UPDATE SET
                counted_quantity = EXCLUDED.counted_quantity,
                notes = EXCLUDED.notes,
                counted_by = EXCLUDED.counted_by,
                counted_at = NOW()
            RETURNING *
            "#,
        )
        .bind(counting_id)
        .bind(product_id)
        .bind(counted_quantity)
        .bind(notes)
        .bind(counted_by)
        .fetch_one(&self.pool)
        .await?;

        Ok(item)
    }

    async fn list_counted_items(&self, counting_id: Uuid) -> Result<Vec<CountedItem>, AppError> {
        let items = sqlx::query_as::<_, CountedItem>(
            "SELECT * FROM counted_items WHERE counting_id = $1 ORDER BY counted_at ASC",
        )
        .bind(counting_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }
}
