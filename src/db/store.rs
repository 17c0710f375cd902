// src/db/store.rs

// Contrato abstrato do gateway de persistência consumido pelos services.
// O core só conhece estes traits; o Postgres é um detalhe dos repositórios
// e os testes usam implementações em memória.

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::counting::{Counting, CountingPatch, CountingStatus, CountedItem, NewCounting},
    models::inventory::{NewStockMovement, Product, Sector, StockMovement},
};

#[async_trait]
pub trait CountingStore: Send + Sync {
    /// Cria a contagem com seus setores e aloca o `internal_id` sequencial
    /// do tenant, tudo em uma única transação.
    async fn create_counting(&self, new: NewCounting) -> Result<Counting, AppError>;

    async fn get_counting(&self, tenant_id: Uuid, id: Uuid)
        -> Result<Option<Counting>, AppError>;

    /// Busca pelo token do link compartilhável (sem escopo de tenant: o
    /// token é a própria capacidade de acesso).
    async fn get_counting_by_token(&self, token: Uuid) -> Result<Option<Counting>, AppError>;

    async fn list_countings(&self, tenant_id: Uuid) -> Result<Vec<Counting>, AppError>;

    /// Contagens em status `pending`/`in_progress`. Com `tenant_id = None`
    /// varre todos os tenants (uso do timer de expiração).
    async fn list_active_countings(
        &self,
        tenant_id: Option<Uuid>,
    ) -> Result<Vec<Counting>, AppError>;

    /// Escrita condicional: aplica o patch apenas se o status atual está em
    /// `expected`. Retorna `None` quando nenhuma linha foi afetada (a
    /// pré-condição falhou, outro escritor venceu).
    async fn transition_counting(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        expected: &[CountingStatus],
        patch: CountingPatch,
    ) -> Result<Option<Counting>, AppError>;

    async fn list_counting_sectors(&self, counting_id: Uuid) -> Result<Vec<Uuid>, AppError>;

    /// Upsert por (counting_id, product_id): a última escrita vence.
    async fn upsert_counted_item(
        &self,
        counting_id: Uuid,
        product_id: Uuid,
        counted_quantity: Decimal,
        notes: Option<String>,
        counted_by: Option<String>,
    ) -> Result<CountedItem, AppError>;

    async fn list_counted_items(&self, counting_id: Uuid) -> Result<Vec<CountedItem>, AppError>;
}

#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn create_sector(
        &self,
        tenant_id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> Result<Sector, AppError>;

    async fn list_sectors(&self, tenant_id: Uuid) -> Result<Vec<Sector>, AppError>;

    async fn create_product(
        &self,
        tenant_id: Uuid,
        sector_id: Uuid,
        name: &str,
        unit: &str,
        current_stock: Decimal,
    ) -> Result<Product, AppError>;

    async fn list_products(&self, tenant_id: Uuid) -> Result<Vec<Product>, AppError>;

    /// Busca em lote pelos ids distintos referenciados pelos itens contados
    /// (uma única query, sem N+1). Ids sem produto simplesmente não voltam.
    async fn list_products_by_ids(
        &self,
        tenant_id: Uuid,
        ids: &[Uuid],
    ) -> Result<Vec<Product>, AppError>;

    /// Insere os lançamentos da reconciliação em um único batch.
    async fn insert_stock_movements(
        &self,
        movements: &[NewStockMovement],
    ) -> Result<(), AppError>;

    /// Histórico de movimentações de um produto, mais recente primeiro.
    async fn list_product_movements(
        &self,
        tenant_id: Uuid,
        product_id: Uuid,
    ) -> Result<Vec<StockMovement>, AppError>;

    async fn update_product_stock(
        &self,
        tenant_id: Uuid,
        product_id: Uuid,
        new_stock: Decimal,
    ) -> Result<(), AppError>;
}
