// src/models/inventory.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- 1. Setores ---
// Área física/lógica de armazenagem dentro de um tenant (ex: "Cozinha", "Estoque Seco").
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Sector {
    pub id: Uuid,

    #[schema(ignore)]
    pub tenant_id: Uuid,

    #[schema(example = "Estoque Seco")]
    pub name: String,

    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- 2. Produtos ---
// `current_stock` é o saldo autoritativo; dentro deste serviço só a
// reconciliação de aprovação o reescreve.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,

    #[schema(ignore)]
    pub tenant_id: Uuid,

    pub sector_id: Uuid,

    #[schema(example = "Arroz Agulhinha 5kg")]
    pub name: String,

    #[schema(example = "kg")]
    pub unit: String,

    #[schema(example = "42.5")]
    pub current_stock: Decimal,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- 3. Movimentações de Estoque ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "stock_movement_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StockMovementType {
    // Único tipo emitido por este fluxo; o sinal da diferença fica
    // recuperável em quantity_after - quantity_before.
    CountingApproved,
}

// Lançamento imutável do livro-razão (append-only, nunca atualizado ou apagado).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub id: Uuid,

    #[schema(ignore)]
    pub tenant_id: Uuid,

    pub product_id: Uuid,
    pub quantity_before: Decimal,
    pub quantity_after: Decimal,
    pub movement_type: StockMovementType,

    // A contagem que originou o lançamento
    pub reference_id: Uuid,

    // O aprovador
    pub user_id: Uuid,

    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

// Lançamento ainda não persistido, preparado pela reconciliação.
#[derive(Debug, Clone)]
pub struct NewStockMovement {
    pub tenant_id: Uuid,
    pub product_id: Uuid,
    pub quantity_before: Decimal,
    pub quantity_after: Decimal,
    pub movement_type: StockMovementType,
    pub reference_id: Uuid,
    pub user_id: Uuid,
    pub notes: Option<String>,
}
