use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::counting::CountingStatus;

// Erro simples de API, usado como rejeição pelos extratores (cabeçalhos
// ausentes/inválidos), onde ainda não existe um AppError de domínio.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Contagem não encontrada")]
    CountingNotFound,

    #[error("Setor não encontrado")]
    SectorNotFound,

    #[error("Link de contagem inválido ou expirado")]
    InvalidPublicToken,

    // Transição fora do grafo permitido. Rejeitada antes de qualquer escrita;
    // também é o resultado de uma escrita condicional que não afetou linhas
    // (outro operador venceu a corrida).
    #[error("Ação '{action}' não é permitida para uma contagem '{status}'")]
    IllegalTransition {
        action: &'static str,
        status: CountingStatus,
    },

    // Os lançamentos foram gravados mas parte das atualizações de saldo falhou.
    // Distinto de uma falha limpa: o operador precisa saber que alguns saldos
    // já podem estar inconsistentes e revisar/repetir a aprovação.
    #[error("Reconciliação parcial: {updated} de {total} produtos atualizados")]
    PartialReconciliation { updated: usize, total: usize },

    // Variante para erros de banco de dados (falha transitória de IO/backend)
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            // Retorna todos os detalhes da validação, campo a campo.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }

            AppError::CountingNotFound => {
                (StatusCode::NOT_FOUND, "Contagem não encontrada.".to_string())
            }
            AppError::SectorNotFound => {
                (StatusCode::NOT_FOUND, "Setor não encontrado.".to_string())
            }
            AppError::InvalidPublicToken => (
                StatusCode::NOT_FOUND,
                "Link de contagem inválido ou expirado.".to_string(),
            ),

            AppError::IllegalTransition { action, status } => (
                StatusCode::CONFLICT,
                format!(
                    "A ação '{}' não é permitida para uma contagem com status '{}'.",
                    action, status
                ),
            ),

            // Corpo distinto: o chamador precisa distinguir "nada aplicado"
            // de "parcialmente aplicado, revisar saldos".
            AppError::PartialReconciliation { updated, total } => {
                tracing::error!(
                    "Reconciliação parcial: {} de {} produtos atualizados",
                    updated,
                    total
                );
                let body = Json(json!({
                    "error": "A aprovação falhou após aplicar parte das atualizações de saldo.",
                    "partial": true,
                    "productsUpdated": updated,
                    "productsTotal": total,
                    "hint": "Revise os saldos dos produtos e repita a aprovação.",
                }));
                return (StatusCode::INTERNAL_SERVER_ERROR, body).into_response();
            }

            // Todos os outros erros (DatabaseError, InternalServerError) viram 500.
            // O `tracing` loga a mensagem detalhada que `thiserror` nos deu.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Ocorreu um erro inesperado.".to_string(),
                )
            }
        };

        // Resposta padrão para erros simples que só têm uma mensagem.
        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
