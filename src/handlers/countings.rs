// src/handlers/countings.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    common::error::AppError,
    config::AppState,
    handlers::inventory::validate_not_negative,
    middleware::tenancy::{OperatorContext, TenantContext},
};

// ---
// Payload: CreateCounting (disparo da campanha)
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCountingPayload {
    #[validate(length(min = 1, message = "Informe pelo menos um setor."))]
    pub sector_ids: Vec<Uuid>,

    #[validate(length(min = 1, message = "O nome do funcionário é obrigatório."))]
    pub employee_name: String,

    #[validate(length(min = 1, message = "O número de WhatsApp é obrigatório."))]
    pub whatsapp_number: String,

    // Prazo agendado: ou os dois campos vêm juntos, ou nenhum
    pub scheduled_date: Option<NaiveDate>,
    pub scheduled_time: Option<NaiveTime>,
}

impl CreateCountingPayload {
    fn validate_consistency(&self) -> Result<(), ValidationError> {
        // Regra: data e hora de agendamento andam em par.
        if self.scheduled_date.is_some() != self.scheduled_time.is_some() {
            return Err(ValidationError::new("ScheduleRequiresDateAndTime"));
        }
        Ok(())
    }
}

// ---
// Handler: create_counting
// ---
#[utoipa::path(
    post,
    path = "/api/countings",
    tag = "countings",
    request_body = CreateCountingPayload,
    responses(
        (status = 201, description = "Contagem criada", body = crate::models::counting::Counting),
        (status = 400, description = "Payload inválido"),
    )
)]
pub async fn create_counting(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Json(payload): Json<CreateCountingPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    payload.validate_consistency().map_err(|e| {
        let mut errors = validator::ValidationErrors::new();
        errors.add("scheduledDate", e);
        AppError::ValidationError(errors)
    })?;

    let counting = app_state
        .counting_service
        .create_counting(
            tenant.0,
            payload.sector_ids,
            payload.employee_name,
            payload.whatsapp_number,
            payload.scheduled_date,
            payload.scheduled_time,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(counting)))
}

// ---
// Handler: list_countings
// ---
#[utoipa::path(
    get,
    path = "/api/countings",
    tag = "countings",
    responses(
        (status = 200, description = "Contagens do tenant com estado de exibição", body = [crate::models::counting::CountingDetail]),
    )
)]
pub async fn list_countings(
    State(app_state): State<AppState>,
    tenant: TenantContext,
) -> Result<impl IntoResponse, AppError> {
    // Leitura pura: contagens vencidas aparecem como atrasadas até o timer
    // (ou uma checagem pré-transição) efetivar a expiração
    let details = app_state.counting_service.list_details(tenant.0).await?;
    Ok((StatusCode::OK, Json(details)))
}

// ---
// Handler: get_counting
// ---
#[utoipa::path(
    get,
    path = "/api/countings/{id}",
    tag = "countings",
    params(("id" = Uuid, Path, description = "Id da contagem")),
    responses(
        (status = 200, description = "Detalhe da contagem", body = crate::models::counting::CountingDetail),
        (status = 404, description = "Contagem não encontrada"),
    )
)]
pub async fn get_counting(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let detail = app_state.counting_service.get_detail(tenant.0, id).await?;
    Ok((StatusCode::OK, Json(detail)))
}

// ---
// Transições do ciclo de vida
// ---

#[utoipa::path(
    post,
    path = "/api/countings/{id}/start",
    tag = "countings",
    params(("id" = Uuid, Path, description = "Id da contagem")),
    responses(
        (status = 200, description = "Contagem iniciada", body = crate::models::counting::Counting),
        (status = 409, description = "Transição não permitida"),
    )
)]
pub async fn start_counting(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let counting = app_state.counting_service.start(tenant.0, id).await?;
    Ok((StatusCode::OK, Json(counting)))
}

#[utoipa::path(
    post,
    path = "/api/countings/{id}/complete",
    tag = "countings",
    params(("id" = Uuid, Path, description = "Id da contagem")),
    responses(
        (status = 200, description = "Contagem concluída", body = crate::models::counting::Counting),
        (status = 409, description = "Transição não permitida"),
    )
)]
pub async fn complete_counting(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let counting = app_state.counting_service.complete(tenant.0, id).await?;
    Ok((StatusCode::OK, Json(counting)))
}

#[utoipa::path(
    post,
    path = "/api/countings/{id}/approve",
    tag = "countings",
    params(("id" = Uuid, Path, description = "Id da contagem")),
    responses(
        (status = 200, description = "Contagem aprovada e estoque reconciliado", body = crate::models::counting::ApprovalSummary),
        (status = 409, description = "Transição não permitida"),
        (status = 500, description = "Reconciliação parcial: revisar saldos"),
    )
)]
pub async fn approve_counting(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    operator: OperatorContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let summary = app_state
        .counting_service
        .approve(tenant.0, id, operator.0)
        .await?;
    Ok((StatusCode::OK, Json(summary)))
}

#[utoipa::path(
    post,
    path = "/api/countings/{id}/reopen",
    tag = "countings",
    params(("id" = Uuid, Path, description = "Id da contagem")),
    responses(
        (status = 200, description = "Contagem reaberta para edição", body = crate::models::counting::Counting),
        (status = 409, description = "Fora da janela de reabertura"),
    )
)]
pub async fn reopen_counting(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let counting = app_state.counting_service.reopen(tenant.0, id).await?;
    Ok((StatusCode::OK, Json(counting)))
}

// ---
// Payload: Extend (prorrogação / reativação)
// ---
fn default_extension_hours() -> i64 {
    2
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtendPayload {
    // A UI oferece 1–24h com padrão 2; o contrato exige apenas > 0
    #[validate(range(min = 1, message = "A prorrogação deve ser de pelo menos 1 hora."))]
    #[serde(default = "default_extension_hours")]
    pub hours: i64,
}

#[utoipa::path(
    post,
    path = "/api/countings/{id}/extend",
    tag = "countings",
    params(("id" = Uuid, Path, description = "Id da contagem")),
    request_body = ExtendPayload,
    responses(
        (status = 200, description = "Prazo prorrogado (ou contagem reativada)", body = crate::models::counting::Counting),
        (status = 409, description = "Transição não permitida"),
    )
)]
pub async fn extend_counting(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<ExtendPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let counting = app_state
        .counting_service
        .extend(tenant.0, id, payload.hours)
        .await?;
    Ok((StatusCode::OK, Json(counting)))
}

#[utoipa::path(
    post,
    path = "/api/countings/{id}/force-stop",
    tag = "countings",
    params(("id" = Uuid, Path, description = "Id da contagem")),
    responses(
        (status = 200, description = "Contagem interrompida (vai para 'expired')", body = crate::models::counting::Counting),
        (status = 409, description = "Transição não permitida"),
    )
)]
pub async fn force_stop_counting(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let counting = app_state.counting_service.force_stop(tenant.0, id).await?;
    Ok((StatusCode::OK, Json(counting)))
}

// ---
// Itens contados
// ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitItemPayload {
    pub product_id: Uuid,

    #[validate(custom(function = "validate_not_negative"))]
    pub counted_quantity: Decimal,

    pub notes: Option<String>,
    pub counted_by: Option<String>,
}

#[utoipa::path(
    put,
    path = "/api/countings/{id}/items",
    tag = "countings",
    params(("id" = Uuid, Path, description = "Id da contagem")),
    request_body = SubmitItemPayload,
    responses(
        (status = 200, description = "Quantidade registrada (upsert)", body = crate::models::counting::CountedItem),
        (status = 409, description = "Contagem não está mais ativa"),
    )
)]
pub async fn submit_counted_item(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubmitItemPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let counting = app_state.counting_service.get_counting(tenant.0, id).await?;
    let item = app_state
        .counting_service
        .submit_counted_item(
            &counting,
            payload.product_id,
            payload.counted_quantity,
            payload.notes,
            payload.counted_by,
        )
        .await?;
    Ok((StatusCode::OK, Json(item)))
}

#[utoipa::path(
    get,
    path = "/api/countings/{id}/items",
    tag = "countings",
    params(("id" = Uuid, Path, description = "Id da contagem")),
    responses(
        (status = 200, description = "Itens contados", body = [crate::models::counting::CountedItem]),
    )
)]
pub async fn list_counted_items(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    // Garante o escopo de tenant antes de listar
    let counting = app_state.counting_service.get_counting(tenant.0, id).await?;
    let items = app_state
        .counting_service
        .list_counted_items(counting.id)
        .await?;
    Ok((StatusCode::OK, Json(items)))
}

// ---
// Link compartilhável (operador de campo, sem sessão)
// ---

#[utoipa::path(
    get,
    path = "/api/public/countings/{token}",
    tag = "public",
    params(("token" = Uuid, Path, description = "Token do link compartilhável")),
    responses(
        (status = 200, description = "Detalhe da contagem", body = crate::models::counting::CountingDetail),
        (status = 404, description = "Link inválido"),
    )
)]
pub async fn get_public_counting(
    State(app_state): State<AppState>,
    Path(token): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let detail = app_state
        .counting_service
        .get_detail_by_token(token)
        .await?;
    Ok((StatusCode::OK, Json(detail)))
}

#[utoipa::path(
    put,
    path = "/api/public/countings/{token}/items",
    tag = "public",
    params(("token" = Uuid, Path, description = "Token do link compartilhável")),
    request_body = SubmitItemPayload,
    responses(
        (status = 200, description = "Quantidade registrada (upsert)", body = crate::models::counting::CountedItem),
        (status = 404, description = "Link inválido"),
        (status = 409, description = "Contagem não está mais ativa"),
    )
)]
pub async fn submit_public_counted_item(
    State(app_state): State<AppState>,
    Path(token): Path<Uuid>,
    Json(payload): Json<SubmitItemPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let counting = app_state
        .counting_service
        .get_counting_by_token(token)
        .await?;
    let item = app_state
        .counting_service
        .submit_counted_item(
            &counting,
            payload.product_id,
            payload.counted_quantity,
            payload.notes,
            payload.counted_by,
        )
        .await?;
    Ok((StatusCode::OK, Json(item)))
}
