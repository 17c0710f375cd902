// src/services/reconciliation_service.rs

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{CountingStore, InventoryStore},
    models::counting::{ApprovalSummary, CountingPatch, CountingStatus},
    models::inventory::{NewStockMovement, Product, StockMovementType},
};

// Reconciliação de estoque: roda exatamente uma vez, de forma síncrona,
// como parte da transição completed -> approved. Compara cada quantidade
// contada com o saldo atual, emite um lançamento por diferença não nula e
// grava o novo saldo.
#[derive(Clone)]
pub struct ReconciliationService {
    counting_store: Arc<dyn CountingStore>,
    inventory_store: Arc<dyn InventoryStore>,
}

impl ReconciliationService {
    pub fn new(
        counting_store: Arc<dyn CountingStore>,
        inventory_store: Arc<dyn InventoryStore>,
    ) -> Self {
        Self {
            counting_store,
            inventory_store,
        }
    }

    pub async fn approve_counting(
        &self,
        tenant_id: Uuid,
        counting_id: Uuid,
        approved_by: Uuid,
    ) -> Result<ApprovalSummary, AppError> {
        let now = Utc::now();

        // 1. Carrega e valida o estado de origem antes de qualquer escrita.
        // Reaprovar uma contagem já aprovada cai aqui, o que impede a
        // geração duplicada de lançamentos.
        let counting = self
            .counting_store
            .get_counting(tenant_id, counting_id)
            .await?
            .ok_or(AppError::CountingNotFound)?;
        if counting.status != CountingStatus::Completed {
            return Err(AppError::IllegalTransition {
                action: "approve",
                status: counting.status,
            });
        }

        // 2. Itens contados. Conjunto vazio é legal: a aprovação apenas
        // registra zero movimentações.
        let items = self.counting_store.list_counted_items(counting_id).await?;

        // 3. Produtos referenciados, em uma única busca em lote
        let mut product_ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
        product_ids.sort();
        product_ids.dedup();

        let products = if product_ids.is_empty() {
            Vec::new()
        } else {
            self.inventory_store
                .list_products_by_ids(tenant_id, &product_ids)
                .await?
        };
        let products_by_id: HashMap<Uuid, &Product> =
            products.iter().map(|p| (p.id, p)).collect();

        // 4. Prepara lançamentos e novos saldos
        let mut movements: Vec<NewStockMovement> = Vec::new();
        let mut stock_updates: Vec<(Uuid, rust_decimal::Decimal)> = Vec::new();

        for item in &items {
            let Some(product) = products_by_id.get(&item.product_id) else {
                // Produto apagado depois que a contagem começou: item órfão
                // é ignorado sem derrubar a aprovação
                tracing::warn!(
                    "Item contado ignorado: produto {} não existe mais",
                    item.product_id
                );
                continue;
            };

            let difference = item.counted_quantity - product.current_stock;
            if difference.is_zero() {
                continue;
            }

            movements.push(NewStockMovement {
                tenant_id,
                product_id: product.id,
                quantity_before: product.current_stock,
                quantity_after: item.counted_quantity,
                movement_type: StockMovementType::CountingApproved,
                reference_id: counting_id,
                user_id: approved_by,
                notes: item.notes.clone(),
            });
            stock_updates.push((product.id, item.counted_quantity));
        }

        // 5. Lançamentos em um único batch. Falha aqui aborta a aprovação
        // inteira: nenhum saldo foi tocado e o status não avança.
        self.inventory_store
            .insert_stock_movements(&movements)
            .await?;

        // 6. Saldos, uma escrita por produto. Uma falha no meio vira erro
        // parcial: o que já foi aplicado não é revertido, o status não
        // avança e o operador é avisado para revisar e repetir.
        let total = stock_updates.len();
        for (applied, (product_id, new_stock)) in stock_updates.iter().enumerate() {
            self.inventory_store
                .update_product_stock(tenant_id, *product_id, *new_stock)
                .await
                .map_err(|e| {
                    tracing::error!(
                        "Falha ao atualizar saldo do produto {}: {}",
                        product_id,
                        e
                    );
                    AppError::PartialReconciliation {
                        updated: applied,
                        total,
                    }
                })?;
        }

        // 7. Só agora o status avança, condicionado a ainda ser 'completed'.
        // Um aprovador concorrente afeta zero linhas e é rejeitado aqui.
        let updated = self
            .counting_store
            .transition_counting(
                tenant_id,
                counting_id,
                &[CountingStatus::Completed],
                CountingPatch {
                    status: Some(CountingStatus::Approved),
                    approved_at: Some(now),
                    ..Default::default()
                },
            )
            .await?;

        if updated.is_none() {
            let status = self
                .counting_store
                .get_counting(tenant_id, counting_id)
                .await?
                .map(|c| c.status)
                .unwrap_or(counting.status);
            return Err(AppError::IllegalTransition {
                action: "approve",
                status,
            });
        }

        tracing::info!(
            "Contagem {} aprovada: {} movimentações, {} saldos atualizados",
            counting.internal_id,
            movements.len(),
            total
        );

        Ok(ApprovalSummary {
            movements_generated: movements.len(),
            products_updated: total,
        })
    }
}
