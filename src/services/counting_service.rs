// src/services/counting_service.rs

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::CountingStore,
    models::counting::{
        ApprovalSummary, Counting, CountingDetail, CountingDisplay, CountingPatch,
        CountingStatus, CountedItem, NewCounting, UrgencyTier,
    },
    services::reconciliation_service::ReconciliationService,
};

// Janela para reabrir uma contagem concluída
const REOPEN_WINDOW_HOURS: i64 = 24;
// Prazo que uma reabertura devolve à contagem
const REOPEN_GRACE_HOURS: i64 = 2;
// Fallback de expiração quando não há agendamento (ou folga após ele)
const DEFAULT_EXPIRATION_HOURS: i64 = 24;

// ---
// Funções puras de agenda/exibição
// ---

/// Deadline efetivo de uma contagem: agendamento explícito (data + hora,
/// interpretados como UTC) tem precedência sobre `expires_at`; sem nenhum
/// dos dois não há prazo e a contagem nunca expira sozinha.
pub fn resolve_deadline(counting: &Counting) -> Option<DateTime<Utc>> {
    if let (Some(date), Some(time)) = (counting.scheduled_date, counting.scheduled_time) {
        return Some(date.and_time(time).and_utc());
    }
    counting.expires_at
}

/// Predicado de reabertura: concluída há no máximo 24h.
pub fn can_reopen(counting: &Counting, now: DateTime<Utc>) -> bool {
    counting.status == CountingStatus::Completed
        && counting
            .completed_at
            .map(|done| now - done <= Duration::hours(REOPEN_WINDOW_HOURS))
            .unwrap_or(false)
}

/// Estado de exibição ("tempo restante") derivado do estado atual.
/// Função pura: nunca grava nada; expirar é responsabilidade do timer
/// (`sweep_expirations`) e da checagem pré-transição.
pub fn derive_display_state(counting: &Counting, now: DateTime<Utc>) -> CountingDisplay {
    match counting.status {
        CountingStatus::Approved => CountingDisplay {
            label: "—".to_string(),
            tier: UrgencyTier::Normal,
            overdue: false,
        },
        CountingStatus::Completed => CountingDisplay {
            label: "Concluída".to_string(),
            tier: UrgencyTier::Normal,
            overdue: false,
        },
        CountingStatus::Expired => CountingDisplay {
            label: "Expirada".to_string(),
            tier: UrgencyTier::Normal,
            overdue: false,
        },
        CountingStatus::Pending | CountingStatus::InProgress => {
            let Some(deadline) = resolve_deadline(counting) else {
                return CountingDisplay {
                    label: "Sem prazo".to_string(),
                    tier: UrgencyTier::Normal,
                    overdue: false,
                };
            };

            let delta = deadline - now;
            if delta < Duration::zero() {
                // Atrasada: dias quando >= 1 dia, senão horas (mínimo 1h)
                let late = -delta;
                let label = if late >= Duration::days(1) {
                    format!("{}d atrasada", late.num_days())
                } else {
                    format!("{}h atrasada", late.num_hours().max(1))
                };
                CountingDisplay {
                    label,
                    tier: UrgencyTier::Critical,
                    overdue: true,
                }
            } else {
                let label = if delta >= Duration::days(1) {
                    format!("{}d", delta.num_days())
                } else if delta >= Duration::hours(1) {
                    format!("{}h", delta.num_hours())
                } else {
                    format!("{}min", delta.num_minutes().max(1))
                };
                let tier = if delta <= Duration::days(1) {
                    UrgencyTier::Warning
                } else {
                    UrgencyTier::Normal
                };
                CountingDisplay {
                    label,
                    tier,
                    overdue: false,
                }
            }
        }
    }
}

// ---
// Service
// ---

#[derive(Clone)]
pub struct CountingService {
    store: Arc<dyn CountingStore>,
    reconciliation: ReconciliationService,
}

impl CountingService {
    pub fn new(store: Arc<dyn CountingStore>, reconciliation: ReconciliationService) -> Self {
        Self {
            store,
            reconciliation,
        }
    }

    // --- CRIAÇÃO (disparo da campanha) ---
    pub async fn create_counting(
        &self,
        tenant_id: Uuid,
        sector_ids: Vec<Uuid>,
        employee_name: String,
        whatsapp_number: String,
        scheduled_date: Option<chrono::NaiveDate>,
        scheduled_time: Option<chrono::NaiveTime>,
    ) -> Result<Counting, AppError> {
        let now = Utc::now();

        // expires_at: 24h após o prazo agendado, ou 24h da criação sem agenda
        let scheduled_instant = match (scheduled_date, scheduled_time) {
            (Some(date), Some(time)) => Some(date.and_time(time).and_utc()),
            _ => None,
        };
        let expires_at = scheduled_instant
            .map(|deadline| deadline + Duration::hours(DEFAULT_EXPIRATION_HOURS))
            .unwrap_or(now + Duration::hours(DEFAULT_EXPIRATION_HOURS));

        let counting = self
            .store
            .create_counting(NewCounting {
                tenant_id,
                sector_ids,
                employee_name,
                whatsapp_number,
                scheduled_date,
                scheduled_time,
                expires_at: Some(expires_at),
            })
            .await?;

        tracing::info!(
            "Contagem {} criada para o tenant {}",
            counting.internal_id,
            tenant_id
        );
        Ok(counting)
    }

    // --- LEITURAS ---

    pub async fn get_counting(&self, tenant_id: Uuid, id: Uuid) -> Result<Counting, AppError> {
        self.store
            .get_counting(tenant_id, id)
            .await?
            .ok_or(AppError::CountingNotFound)
    }

    pub async fn get_counting_by_token(&self, token: Uuid) -> Result<Counting, AppError> {
        self.store
            .get_counting_by_token(token)
            .await?
            .ok_or(AppError::InvalidPublicToken)
    }

    pub async fn get_detail(&self, tenant_id: Uuid, id: Uuid) -> Result<CountingDetail, AppError> {
        let counting = self.get_counting(tenant_id, id).await?;
        self.to_detail(counting).await
    }

    pub async fn get_detail_by_token(&self, token: Uuid) -> Result<CountingDetail, AppError> {
        let counting = self.get_counting_by_token(token).await?;
        self.to_detail(counting).await
    }

    pub async fn list_details(&self, tenant_id: Uuid) -> Result<Vec<CountingDetail>, AppError> {
        let countings = self.store.list_countings(tenant_id).await?;
        let mut details = Vec::with_capacity(countings.len());
        for counting in countings {
            details.push(self.to_detail(counting).await?);
        }
        Ok(details)
    }

    async fn to_detail(&self, counting: Counting) -> Result<CountingDetail, AppError> {
        let sector_ids = self.store.list_counting_sectors(counting.id).await?;
        let display = derive_display_state(&counting, Utc::now());
        Ok(CountingDetail {
            counting,
            sector_ids,
            display,
        })
    }

    // --- ITENS CONTADOS ---

    pub async fn submit_counted_item(
        &self,
        counting: &Counting,
        product_id: Uuid,
        counted_quantity: rust_decimal::Decimal,
        notes: Option<String>,
        counted_by: Option<String>,
    ) -> Result<CountedItem, AppError> {
        // Só aceita quantidades enquanto a contagem está ativa
        if !matches!(
            counting.status,
            CountingStatus::Pending | CountingStatus::InProgress
        ) {
            return Err(AppError::IllegalTransition {
                action: "submit_item",
                status: counting.status,
            });
        }
        self.store
            .upsert_counted_item(counting.id, product_id, counted_quantity, notes, counted_by)
            .await
    }

    pub async fn list_counted_items(
        &self,
        counting_id: Uuid,
    ) -> Result<Vec<CountedItem>, AppError> {
        self.store.list_counted_items(counting_id).await
    }

    // --- TRANSIÇÕES ---

    /// Checagem pré-transição: uma contagem ativa já vencida é expirada
    /// agora, antes de validar a ação pedida. Idempotente (escrita
    /// condicional do mesmo valor alvo) e restrita às transições; leituras
    /// nunca disparam expiração, só o timer e esta checagem.
    async fn refresh_expiration(&self, counting: Counting) -> Result<Counting, AppError> {
        if !matches!(
            counting.status,
            CountingStatus::Pending | CountingStatus::InProgress
        ) {
            return Ok(counting);
        }
        let Some(deadline) = resolve_deadline(&counting) else {
            return Ok(counting);
        };
        if Utc::now() <= deadline {
            return Ok(counting);
        }

        match self
            .store
            .transition_counting(
                counting.tenant_id,
                counting.id,
                &[CountingStatus::Pending, CountingStatus::InProgress],
                CountingPatch {
                    status: Some(CountingStatus::Expired),
                    ..Default::default()
                },
            )
            .await?
        {
            Some(expired) => Ok(expired),
            // Outro escritor já resolveu; segue com o estado mais novo
            None => self.get_counting(counting.tenant_id, counting.id).await,
        }
    }

    /// Valida o status de origem antes de qualquer escrita e depois aplica a
    /// transição como escrita condicional: se outro operador mudou o status
    /// no meio do caminho, zero linhas são afetadas e a ação é rejeitada.
    async fn transition(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        action: &'static str,
        from: &[CountingStatus],
        patch: CountingPatch,
    ) -> Result<Counting, AppError> {
        let current = self.get_counting(tenant_id, id).await?;
        let current = self.refresh_expiration(current).await?;
        if !from.contains(&current.status) {
            return Err(AppError::IllegalTransition {
                action,
                status: current.status,
            });
        }

        match self
            .store
            .transition_counting(tenant_id, id, from, patch)
            .await?
        {
            Some(updated) => {
                tracing::info!(
                    "Contagem {}: {} -> {}",
                    updated.internal_id,
                    current.status,
                    updated.status
                );
                Ok(updated)
            }
            None => {
                // A pré-condição falhou entre a leitura e a escrita
                let status = self
                    .store
                    .get_counting(tenant_id, id)
                    .await?
                    .map(|c| c.status)
                    .unwrap_or(current.status);
                Err(AppError::IllegalTransition { action, status })
            }
        }
    }

    pub async fn start(&self, tenant_id: Uuid, id: Uuid) -> Result<Counting, AppError> {
        self.transition(
            tenant_id,
            id,
            "start",
            &[CountingStatus::Pending],
            CountingPatch {
                status: Some(CountingStatus::InProgress),
                started_at: Some(Utc::now()),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn complete(&self, tenant_id: Uuid, id: Uuid) -> Result<Counting, AppError> {
        self.transition(
            tenant_id,
            id,
            "complete",
            &[CountingStatus::InProgress],
            CountingPatch {
                status: Some(CountingStatus::Completed),
                completed_at: Some(Utc::now()),
                ..Default::default()
            },
        )
        .await
    }

    /// Reabre uma contagem concluída há menos de 24h, devolvendo uma janela
    /// de 2h de edição. `completed_at` é preservado (timestamps gravam uma
    /// única vez), então a janela é sempre medida da conclusão original.
    pub async fn reopen(&self, tenant_id: Uuid, id: Uuid) -> Result<Counting, AppError> {
        let now = Utc::now();
        let current = self.get_counting(tenant_id, id).await?;
        if !can_reopen(&current, now) {
            return Err(AppError::IllegalTransition {
                action: "reopen",
                status: current.status,
            });
        }

        self.transition(
            tenant_id,
            id,
            "reopen",
            &[CountingStatus::Completed],
            CountingPatch {
                status: Some(CountingStatus::InProgress),
                expires_at: Some(now + Duration::hours(REOPEN_GRACE_HOURS)),
                ..Default::default()
            },
        )
        .await
    }

    /// Estende o prazo em `hours` horas (contrato: hours > 0; a UI oferece
    /// 1–24 com padrão 2).
    ///
    /// - `in_progress`: empurra `expires_at` para frente sem mudar o status.
    /// - `expired`: reativa. Volta para `in_progress` e o novo prazo é
    ///   reescrito nos campos de agendamento (now + hours).
    pub async fn extend(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        hours: i64,
    ) -> Result<Counting, AppError> {
        let now = Utc::now();
        let current = self.get_counting(tenant_id, id).await?;
        let current = self.refresh_expiration(current).await?;

        match current.status {
            CountingStatus::InProgress => {
                let base = current.expires_at.unwrap_or(now);
                self.transition(
                    tenant_id,
                    id,
                    "extend",
                    &[CountingStatus::InProgress],
                    CountingPatch {
                        expires_at: Some(base + Duration::hours(hours)),
                        ..Default::default()
                    },
                )
                .await
            }
            CountingStatus::Expired => {
                let deadline = now + Duration::hours(hours);
                self.transition(
                    tenant_id,
                    id,
                    "extend",
                    &[CountingStatus::Expired],
                    CountingPatch {
                        status: Some(CountingStatus::InProgress),
                        scheduled_date: Some(deadline.date_naive()),
                        scheduled_time: Some(deadline.time()),
                        ..Default::default()
                    },
                )
                .await
            }
            status => Err(AppError::IllegalTransition {
                action: "extend",
                status,
            }),
        }
    }

    /// Interrupção forçada pelo operador: a contagem vai para `expired` (e
    /// não `completed`, caminho deliberadamente distinto da conclusão
    /// natural), registrando o momento da parada em `completed_at`.
    pub async fn force_stop(&self, tenant_id: Uuid, id: Uuid) -> Result<Counting, AppError> {
        self.transition(
            tenant_id,
            id,
            "force_stop",
            &[CountingStatus::InProgress],
            CountingPatch {
                status: Some(CountingStatus::Expired),
                completed_at: Some(Utc::now()),
                ..Default::default()
            },
        )
        .await
    }

    /// Aprova uma contagem concluída, rodando a reconciliação de estoque.
    pub async fn approve(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        approved_by: Uuid,
    ) -> Result<ApprovalSummary, AppError> {
        self.reconciliation
            .approve_counting(tenant_id, id, approved_by)
            .await
    }

    // --- EXPIRAÇÃO AUTOMÁTICA ---

    /// Varre contagens ativas vencidas e as marca como expiradas. Idempotente
    /// e seguro sob varredores concorrentes: a escrita é condicional ao
    /// status ainda ser ativo, então o pior caso é escrever o mesmo valor.
    /// Com `tenant_id = None` varre todos os tenants (uso do timer).
    pub async fn sweep_expirations(
        &self,
        tenant_id: Option<Uuid>,
    ) -> Result<usize, AppError> {
        let now = Utc::now();
        let active = self.store.list_active_countings(tenant_id).await?;

        let mut expired = 0;
        for counting in active {
            let Some(deadline) = resolve_deadline(&counting) else {
                continue;
            };
            if now <= deadline {
                continue;
            }

            let swept = self
                .store
                .transition_counting(
                    counting.tenant_id,
                    counting.id,
                    &[CountingStatus::Pending, CountingStatus::InProgress],
                    CountingPatch {
                        status: Some(CountingStatus::Expired),
                        ..Default::default()
                    },
                )
                .await?;

            if swept.is_some() {
                tracing::info!(
                    "Contagem {} expirada automaticamente (prazo {})",
                    counting.internal_id,
                    deadline
                );
                expired += 1;
            }
        }
        Ok(expired)
    }
}
