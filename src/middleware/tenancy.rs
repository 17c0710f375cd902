// src/middleware/tenancy.rs

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use uuid::Uuid;

use crate::common::error::ApiError;

// Cabeçalhos HTTP customizados de escopo
const TENANT_ID_HEADER: &str = "x-tenant-id";
const USER_ID_HEADER: &str = "x-user-id";

fn header_uuid(parts: &Parts, header: &str) -> Result<Uuid, ApiError> {
    let value = parts.headers.get(header).ok_or_else(|| ApiError {
        status: StatusCode::BAD_REQUEST,
        message: format!("O cabeçalho {} é obrigatório.", header),
    })?;

    let value_str = value.to_str().map_err(|_| ApiError {
        status: StatusCode::BAD_REQUEST,
        message: format!("Cabeçalho {} contém caracteres inválidos.", header),
    })?;

    Uuid::parse_str(value_str).map_err(|_| ApiError {
        status: StatusCode::BAD_REQUEST,
        message: format!("Cabeçalho {} inválido (não é um UUID).", header),
    })
}

// O extrator de tenant: toda rota /api é escopada pelo X-Tenant-ID.
#[derive(Debug, Clone)]
pub struct TenantContext(pub Uuid);

impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(TenantContext(header_uuid(parts, TENANT_ID_HEADER)?))
    }
}

// O operador autenticado (a sessão em si é responsabilidade do gateway de
// autenticação na frente deste serviço; aqui só precisamos do id para
// carimbar aprovações).
#[derive(Debug, Clone)]
pub struct OperatorContext(pub Uuid);

impl<S> FromRequestParts<S> for OperatorContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(OperatorContext(header_uuid(parts, USER_ID_HEADER)?))
    }
}
