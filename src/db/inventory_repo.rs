// src/db/inventory_repo.rs

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::store::InventoryStore,
    models::inventory::{NewStockMovement, Product, Sector, StockMovement, StockMovementType},
};

#[derive(Clone)]
pub struct InventoryRepository {
    pool: PgPool,
}

impl InventoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InventoryStore for InventoryRepository {
    // ---
    // Setores
    // ---
    async fn create_sector(
        &self,
        tenant_id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> Result<Sector, AppError> {
        let sector = sqlx::query_as::<_, Sector>(
            r#"
            INSERT INTO sectors (tenant_id, name, description)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(name)
        .bind(description)
        .fetch_one(&self.pool)
        .await?;

        Ok(sector)
    }

    async fn list_sectors(&self, tenant_id: Uuid) -> Result<Vec<Sector>, AppError> {
        let sectors = sqlx::query_as::<_, Sector>(
            "SELECT * FROM sectors WHERE tenant_id = $1 ORDER BY name ASC",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(sectors)
    }

    // ---
    // Produtos
    // ---
    async fn create_product(
        &self,
        tenant_id: Uuid,
        sector_id: Uuid,
        name: &str,
        unit: &str,
        current_stock: Decimal,
    ) -> Result<Product, AppError> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (tenant_id, sector_id, name, unit, current_stock)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(sector_id)
        .bind(name)
        .bind(unit)
        .bind(current_stock)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_foreign_key_violation() {
                    return AppError::SectorNotFound;
                }
            }
            e.into()
        })?;

        Ok(product)
    }

    async fn list_products(&self, tenant_id: Uuid) -> Result<Vec<Product>, AppError> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE tenant_id = $1 ORDER BY name ASC",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    async fn list_products_by_ids(
        &self,
        tenant_id: Uuid,
        ids: &[Uuid],
    ) -> Result<Vec<Product>, AppError> {
        let ids: Vec<Uuid> = ids.to_vec();
        let products = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE tenant_id = $1 AND id = ANY($2)",
        )
        .bind(tenant_id)
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    // ---
    // Movimentações (livro-razão)
    // ---
    // Insere o batch inteiro em uma única query via UNNEST. Ou tudo entra,
    // ou nada entra.
    async fn insert_stock_movements(
        &self,
        movements: &[NewStockMovement],
    ) -> Result<(), AppError> {
        if movements.is_empty() {
            return Ok(());
        }

        let tenant_ids: Vec<Uuid> = movements.iter().map(|m| m.tenant_id).collect();
        let product_ids: Vec<Uuid> = movements.iter().map(|m| m.product_id).collect();
        let before: Vec<Decimal> = movements.iter().map(|m| m.quantity_before).collect();
        let after: Vec<Decimal> = movements.iter().map(|m| m.quantity_after).collect();
        let types: Vec<StockMovementType> =
            movements.iter().map(|m| m.movement_type).collect();
        let reference_ids: Vec<Uuid> = movements.iter().map(|m| m.reference_id).collect();
        let user_ids: Vec<Uuid> = movements.iter().map(|m| m.user_id).collect();
        let notes: Vec<Option<String>> = movements.iter().map(|m| m.notes.clone()).collect();

        sqlx::query(
            r#"
            INSERT INTO stock_movements (
                tenant_id, product_id, quantity_before, quantity_after,
                movement_type, reference_id, user_id, notes
            )
            SELECT * FROM UNNEST(
                $1::uuid[], $2::uuid[], $3::numeric[], $4::numeric[],
                $5::stock_movement_type[], $6::uuid[], $7::uuid[], $8::text[]
            )
            "#,
        )
        .bind(&tenant_ids)
        .bind(&product_ids)
        .bind(&before)
        .bind(&after)
        .bind(&types)
        .bind(&reference_ids)
        .bind(&user_ids)
        .bind(&notes)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_product_movements(
        &self,
        tenant_id: Uuid,
        product_id: Uuid,
    ) -> Result<Vec<StockMovement>, AppError> {
        let movements = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT * FROM stock_movements
            WHERE tenant_id = $1 AND product_id = $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(tenant_id)
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(movements)
    }

    async fn update_product_stock(
        &self,
        tenant_id: Uuid,
        product_id: Uuid,
        new_stock: Decimal,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE products
            SET current_stock = $3, updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(tenant_id)
        .bind(product_id)
        .bind(new_stock)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
