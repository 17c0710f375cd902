// src/models/counting.rs

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Enums (Mapeando o Postgres) ---

// O ciclo de vida de uma contagem. O banco usa o enum 'counting_status';
// qualquer valor desconhecido falha na decodificação em vez de virar string solta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "counting_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CountingStatus {
    Pending,
    InProgress,
    Completed,
    Approved,
    Expired,
}

impl CountingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CountingStatus::Pending => "pending",
            CountingStatus::InProgress => "in_progress",
            CountingStatus::Completed => "completed",
            CountingStatus::Approved => "approved",
            CountingStatus::Expired => "expired",
        }
    }
}

impl std::fmt::Display for CountingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Structs ---

// Uma campanha de contagem de estoque, sempre escopada por tenant.
// Os timestamps de transição são gravados uma única vez, nunca sobrescritos.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Counting {
    pub id: Uuid,

    #[schema(ignore)]
    pub tenant_id: Uuid,

    // Sequencial humano por tenant: "001", "002", ...
    #[schema(example = "001")]
    pub internal_id: String,

    pub status: CountingStatus,

    // Contato de quem executa a contagem em campo (texto livre, não é FK de usuário)
    #[schema(example = "João da Silva")]
    pub employee_name: String,

    #[schema(example = "+5511999990000")]
    pub whatsapp_number: String,

    // Prazo agendado (opcional). Quando ambos presentes, formam o deadline.
    pub scheduled_date: Option<NaiveDate>,
    pub scheduled_time: Option<NaiveTime>,

    // Deadline de fallback quando não há agendamento
    pub expires_at: Option<DateTime<Utc>>,

    // Capacidade do link compartilhável (acesso do operador de campo sem sessão)
    pub public_token: Uuid,

    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
}

// Quantidade contada de um produto dentro de uma contagem.
// No máximo um registro por (counting_id, product_id); escrita é upsert.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CountedItem {
    pub id: Uuid,
    pub counting_id: Uuid,
    pub product_id: Uuid,

    // Fracionário é legal (unidades por peso)
    #[schema(example = "12.5")]
    pub counted_quantity: Decimal,

    pub notes: Option<String>,
    pub counted_by: Option<String>,
    pub counted_at: DateTime<Utc>,
}

// --- Entradas de serviço ---

// Dados de criação de uma contagem (o "disparo" da campanha).
// `expires_at` já chega resolvido pelo service (24h da criação, ou 24h após o prazo agendado).
#[derive(Debug, Clone)]
pub struct NewCounting {
    pub tenant_id: Uuid,
    pub sector_ids: Vec<Uuid>,
    pub employee_name: String,
    pub whatsapp_number: String,
    pub scheduled_date: Option<NaiveDate>,
    pub scheduled_time: Option<NaiveTime>,
    pub expires_at: Option<DateTime<Utc>>,
}

// Atualização parcial usada pelas transições: campo presente = campo gravado.
// Nenhuma transição limpa campos, então Option simples basta.
#[derive(Debug, Clone, Default)]
pub struct CountingPatch {
    pub status: Option<CountingStatus>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub scheduled_date: Option<NaiveDate>,
    pub scheduled_time: Option<NaiveTime>,
}

// --- Estado derivado para exibição ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyTier {
    Normal,
    Warning,
    Critical,
}

// Valor puramente derivado (nunca persistido): rótulo de tempo restante + severidade.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CountingDisplay {
    #[schema(example = "5h")]
    pub label: String,
    pub tier: UrgencyTier,
    pub overdue: bool,
}

// Resposta completa para o frontend: contagem + setores + estado derivado.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CountingDetail {
    #[serde(flatten)]
    pub counting: Counting,
    pub sector_ids: Vec<Uuid>,
    pub display: CountingDisplay,
}

// Resumo devolvido pela aprovação (feedback ao usuário).
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalSummary {
    pub movements_generated: usize,
    pub products_updated: usize,
}
