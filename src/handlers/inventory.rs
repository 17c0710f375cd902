// src/handlers/inventory.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{common::error::AppError, config::AppState, middleware::tenancy::TenantContext};

// ---
// Validação Customizada
// ---
pub fn validate_not_negative(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &0.0);
        err.message = Some("O valor não pode ser negativo.".into());
        return Err(err);
    }
    Ok(())
}

// ---
// Payload: CreateSector
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSectorPayload {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: String,

    pub description: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/inventory/sectors",
    tag = "inventory",
    request_body = CreateSectorPayload,
    responses(
        (status = 201, description = "Setor criado", body = crate::models::inventory::Sector),
        (status = 400, description = "Payload inválido"),
    )
)]
pub async fn create_sector(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Json(payload): Json<CreateSectorPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let sector = app_state
        .inventory_store
        .create_sector(tenant.0, &payload.name, payload.description.as_deref())
        .await?;

    Ok((StatusCode::CREATED, Json(sector)))
}

#[utoipa::path(
    get,
    path = "/api/inventory/sectors",
    tag = "inventory",
    responses(
        (status = 200, description = "Setores do tenant", body = [crate::models::inventory::Sector]),
    )
)]
pub async fn list_sectors(
    State(app_state): State<AppState>,
    tenant: TenantContext,
) -> Result<impl IntoResponse, AppError> {
    let sectors = app_state.inventory_store.list_sectors(tenant.0).await?;
    Ok((StatusCode::OK, Json(sectors)))
}

// ---
// Payload: CreateProduct
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductPayload {
    pub sector_id: Uuid,

    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: String,

    #[validate(length(min = 1, message = "A unidade é obrigatória."))]
    pub unit: String,

    // Se o JSON não tiver esse campo, assume 0
    #[validate(custom(function = "validate_not_negative"))]
    #[serde(default)]
    pub current_stock: Decimal,
}

#[utoipa::path(
    post,
    path = "/api/inventory/products",
    tag = "inventory",
    request_body = CreateProductPayload,
    responses(
        (status = 201, description = "Produto criado", body = crate::models::inventory::Product),
        (status = 404, description = "Setor não encontrado"),
    )
)]
pub async fn create_product(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Json(payload): Json<CreateProductPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let product = app_state
        .inventory_store
        .create_product(
            tenant.0,
            payload.sector_id,
            &payload.name,
            &payload.unit,
            payload.current_stock,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(product)))
}

#[utoipa::path(
    get,
    path = "/api/inventory/products",
    tag = "inventory",
    responses(
        (status = 200, description = "Produtos do tenant", body = [crate::models::inventory::Product]),
    )
)]
pub async fn list_products(
    State(app_state): State<AppState>,
    tenant: TenantContext,
) -> Result<impl IntoResponse, AppError> {
    let products = app_state.inventory_store.list_products(tenant.0).await?;
    Ok((StatusCode::OK, Json(products)))
}

#[utoipa::path(
    get,
    path = "/api/inventory/products/{id}/movements",
    tag = "inventory",
    params(("id" = Uuid, Path, description = "Id do produto")),
    responses(
        (status = 200, description = "Histórico de movimentações do produto", body = [crate::models::inventory::StockMovement]),
    )
)]
pub async fn list_product_movements(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let movements = app_state
        .inventory_store
        .list_product_movements(tenant.0, id)
        .await?;
    Ok((StatusCode::OK, Json(movements)))
}
