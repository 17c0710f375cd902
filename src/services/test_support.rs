// src/services/test_support.rs

// Implementação em memória do gateway de persistência, usada pelos testes
// dos services. Mesmo contrato dos repositórios Postgres, incluindo a
// semântica de escrita condicional das transições.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::store::{CountingStore, InventoryStore},
    models::counting::{Counting, CountingPatch, CountingStatus, CountedItem, NewCounting},
    models::inventory::{NewStockMovement, Product, Sector, StockMovement},
    services::{
        counting_service::CountingService, reconciliation_service::ReconciliationService,
    },
};

#[derive(Default)]
pub struct MemoryStore {
    countings: RwLock<HashMap<Uuid, Counting>>,
    sectors_by_counting: RwLock<HashMap<Uuid, Vec<Uuid>>>,
    // Vec por contagem preserva a ordem de inserção dos itens
    items: RwLock<HashMap<Uuid, Vec<CountedItem>>>,
    products: RwLock<HashMap<Uuid, Product>>,
    movements: RwLock<Vec<NewStockMovement>>,
    counters: RwLock<HashMap<Uuid, i64>>,
    sectors: RwLock<HashMap<Uuid, Sector>>,

    // Ganchos de teste
    cas_interference: RwLock<HashMap<Uuid, CountingStatus>>,
    fail_after: RwLock<Option<usize>>,
    updates_applied: RwLock<usize>,
}

pub fn counting_fixture(status: CountingStatus) -> Counting {
    let now = Utc::now();
    Counting {
        id: Uuid::new_v4(),
        tenant_id: Uuid::new_v4(),
        internal_id: "001".to_string(),
        status,
        employee_name: "Operador de Campo".to_string(),
        whatsapp_number: "+5511999990000".to_string(),
        scheduled_date: None,
        scheduled_time: None,
        expires_at: Some(now + Duration::hours(24)),
        public_token: Uuid::new_v4(),
        created_at: now,
        started_at: match status {
            CountingStatus::Pending => None,
            _ => Some(now),
        },
        completed_at: match status {
            CountingStatus::Completed | CountingStatus::Approved => Some(now),
            _ => None,
        },
        approved_at: match status {
            CountingStatus::Approved => Some(now),
            _ => None,
        },
    }
}

/// Monta o grafo de services sobre um único MemoryStore compartilhado.
pub fn memory_services() -> (Arc<MemoryStore>, CountingService, ReconciliationService) {
    let store = Arc::new(MemoryStore::default());
    let counting_store: Arc<dyn CountingStore> = store.clone();
    let inventory_store: Arc<dyn InventoryStore> = store.clone();

    let reconciliation = ReconciliationService::new(counting_store.clone(), inventory_store);
    let service = CountingService::new(counting_store, reconciliation.clone());
    (store, service, reconciliation)
}

impl MemoryStore {
    pub async fn insert_counting(&self, counting: Counting) {
        self.countings.write().await.insert(counting.id, counting);
    }

    pub async fn seed_counting(&self, status: CountingStatus) -> Counting {
        let counting = counting_fixture(status);
        self.insert_counting(counting.clone()).await;
        counting
    }

    pub async fn seed_counting_for(&self, tenant_id: Uuid, status: CountingStatus) -> Counting {
        let mut counting = counting_fixture(status);
        counting.tenant_id = tenant_id;
        self.insert_counting(counting.clone()).await;
        counting
    }

    pub async fn seed_product(&self, tenant_id: Uuid, current_stock: Decimal) -> Uuid {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4(),
            tenant_id,
            sector_id: Uuid::new_v4(),
            name: "Produto de Teste".to_string(),
            unit: "un".to_string(),
            current_stock,
            created_at: now,
            updated_at: now,
        };
        let id = product.id;
        self.products.write().await.insert(id, product);
        id
    }

    pub async fn seed_counted_item(&self, counting_id: Uuid, product_id: Uuid, qty: Decimal) {
        self.upsert_counted_item(counting_id, product_id, qty, None, None)
            .await
            .unwrap();
    }

    pub async fn get(&self, id: Uuid) -> Counting {
        self.countings.read().await.get(&id).cloned().unwrap()
    }

    pub async fn movements(&self) -> Vec<NewStockMovement> {
        self.movements.read().await.clone()
    }

    pub async fn product_stock(&self, id: Uuid) -> Decimal {
        self.products.read().await.get(&id).unwrap().current_stock
    }

    /// Faz as atualizações de saldo falharem depois de `n` sucessos.
    pub async fn fail_stock_updates_after(&self, n: usize) {
        *self.fail_after.write().await = Some(n);
    }

    /// Simula outro escritor mudando o status entre a leitura do service e a
    /// escrita condicional.
    pub async fn set_cas_interference(&self, id: Uuid, status: CountingStatus) {
        self.cas_interference.write().await.insert(id, status);
    }
}

#[async_trait]
impl CountingStore for MemoryStore {
    async fn create_counting(&self, new: NewCounting) -> Result<Counting, AppError> {
        let next = {
            let mut counters = self.counters.write().await;
            let counter = counters.entry(new.tenant_id).or_insert(0);
            *counter += 1;
            *counter
        };

        let now = Utc::now();
        let counting = Counting {
            id: Uuid::new_v4(),
            tenant_id: new.tenant_id,
            internal_id: format!("{:03}", next),
            status: CountingStatus::Pending,
            employee_name: new.employee_name,
            whatsapp_number: new.whatsapp_number,
            scheduled_date: new.scheduled_date,
            scheduled_time: new.scheduled_time,
            expires_at: new.expires_at,
            public_token: Uuid::new_v4(),
            created_at: now,
            started_at: None,
            completed_at: None,
            approved_at: None,
        };

        self.sectors_by_counting
            .write()
            .await
            .insert(counting.id, new.sector_ids);
        self.countings
            .write()
            .await
            .insert(counting.id, counting.clone());
        Ok(counting)
    }

    async fn get_counting(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Counting>, AppError> {
        Ok(self
            .countings
            .read()
            .await
            .get(&id)
            .filter(|c| c.tenant_id == tenant_id)
            .cloned())
    }

    async fn get_counting_by_token(&self, token: Uuid) -> Result<Option<Counting>, AppError> {
        Ok(self
            .countings
            .read()
            .await
            .values()
            .find(|c| c.public_token == token)
            .cloned())
    }

    async fn list_countings(&self, tenant_id: Uuid) -> Result<Vec<Counting>, AppError> {
        let mut countings: Vec<Counting> = self
            .countings
            .read()
            .await
            .values()
            .filter(|c| c.tenant_id == tenant_id)
            .cloned()
            .collect();
        countings.sort_by(|a, b| b.internal_id.cmp(&a.internal_id));
        Ok(countings)
    }

    async fn list_active_countings(
        &self,
        tenant_id: Option<Uuid>,
    ) -> Result<Vec<Counting>, AppError> {
        Ok(self
            .countings
            .read()
            .await
            .values()
            .filter(|c| {
                matches!(
                    c.status,
                    CountingStatus::Pending | CountingStatus::InProgress
                ) && tenant_id.map(|t| c.tenant_id == t).unwrap_or(true)
            })
            .cloned()
            .collect())
    }

    async fn transition_counting(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        expected: &[CountingStatus],
        patch: CountingPatch,
    ) -> Result<Option<Counting>, AppError> {
        // Gancho de corrida: outro escritor muda o status primeiro
        if let Some(forced) = self.cas_interference.write().await.remove(&id) {
            if let Some(counting) = self.countings.write().await.get_mut(&id) {
                counting.status = forced;
            }
        }

        let mut countings = self.countings.write().await;
        let Some(counting) = countings.get_mut(&id) else {
            return Ok(None);
        };
        if counting.tenant_id != tenant_id || !expected.contains(&counting.status) {
            return Ok(None);
        }

        if let Some(status) = patch.status {
            counting.status = status;
        }
        if let Some(v) = patch.started_at {
            counting.started_at = Some(v);
        }
        if let Some(v) = patch.completed_at {
            counting.completed_at = Some(v);
        }
        if let Some(v) = patch.approved_at {
            counting.approved_at = Some(v);
        }
        if let Some(v) = patch.expires_at {
            counting.expires_at = Some(v);
        }
        if let Some(v) = patch.scheduled_date {
            counting.scheduled_date = Some(v);
        }
        if let Some(v) = patch.scheduled_time {
            counting.scheduled_time = Some(v);
        }

        Ok(Some(counting.clone()))
    }

    async fn list_counting_sectors(&self, counting_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        Ok(self
            .sectors_by_counting
            .read()
            .await
            .get(&counting_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn upsert_counted_item(
        &self,
        counting_id: Uuid,
        product_id: Uuid,
        counted_quantity: Decimal,
        notes: Option<String>,
        counted_by: Option<String>,
    ) -> Result<CountedItem, AppError> {
        let mut items = self.items.write().await;
        let list = items.entry(counting_id).or_default();

        let item = CountedItem {
            id: Uuid::new_v4(),
            counting_id,
            product_id,
            counted_quantity,
            notes,
            counted_by,
            counted_at: Utc::now(),
        };

        // A última escrita vence, mantendo a posição original do item
        if let Some(existing) = list.iter_mut().find(|i| i.product_id == product_id) {
            *existing = CountedItem {
                id: existing.id,
                ..item.clone()
            };
            return Ok(existing.clone());
        }
        list.push(item.clone());
        Ok(item)
    }

    async fn list_counted_items(&self, counting_id: Uuid) -> Result<Vec<CountedItem>, AppError> {
        Ok(self
            .items
            .read()
            .await
            .get(&counting_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl InventoryStore for MemoryStore {
    async fn create_sector(
        &self,
        tenant_id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> Result<Sector, AppError> {
        let now = Utc::now();
        let sector = Sector {
            id: Uuid::new_v4(),
            tenant_id,
            name: name.to_string(),
            description: description.map(str::to_string),
            created_at: now,
            updated_at: now,
        };
        self.sectors.write().await.insert(sector.id, sector.clone());
        Ok(sector)
    }

    async fn list_sectors(&self, tenant_id: Uuid) -> Result<Vec<Sector>, AppError> {
        Ok(self
            .sectors
            .read()
            .await
            .values()
            .filter(|s| s.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn create_product(
        &self,
        tenant_id: Uuid,
        sector_id: Uuid,
        name: &str,
        unit: &str,
        current_stock: Decimal,
    ) -> Result<Product, AppError> {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4(),
            tenant_id,
            sector_id,
            name: name.to_string(),
            unit: unit.to_string(),
            current_stock,
            created_at: now,
            updated_at: now,
        };
        self.products
            .write()
            .await
            .insert(product.id, product.clone());
        Ok(product)
    }

    async fn list_products(&self, tenant_id: Uuid) -> Result<Vec<Product>, AppError> {
        Ok(self
            .products
            .read()
            .await
            .values()
            .filter(|p| p.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn list_products_by_ids(
        &self,
        tenant_id: Uuid,
        ids: &[Uuid],
    ) -> Result<Vec<Product>, AppError> {
        Ok(self
            .products
            .read()
            .await
            .values()
            .filter(|p| p.tenant_id == tenant_id && ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn insert_stock_movements(
        &self,
        movements: &[NewStockMovement],
    ) -> Result<(), AppError> {
        self.movements
            .write()
            .await
            .extend(movements.iter().cloned());
        Ok(())
    }

    async fn list_product_movements(
        &self,
        tenant_id: Uuid,
        product_id: Uuid,
    ) -> Result<Vec<StockMovement>, AppError> {
        Ok(self
            .movements
            .read()
            .await
            .iter()
            .filter(|m| m.tenant_id == tenant_id && m.product_id == product_id)
            .map(|m| StockMovement {
                id: Uuid::new_v4(),
                tenant_id: m.tenant_id,
                product_id: m.product_id,
                quantity_before: m.quantity_before,
                quantity_after: m.quantity_after,
                movement_type: m.movement_type,
                reference_id: m.reference_id,
                user_id: m.user_id,
                notes: m.notes.clone(),
                created_at: Utc::now(),
            })
            .collect())
    }

    async fn update_product_stock(
        &self,
        tenant_id: Uuid,
        product_id: Uuid,
        new_stock: Decimal,
    ) -> Result<(), AppError> {
        let applied = {
            let guard = self.updates_applied.read().await;
            *guard
        };
        if let Some(limit) = *self.fail_after.read().await {
            if applied >= limit {
                return Err(AppError::InternalServerError(anyhow::anyhow!(
                    "falha simulada na atualização de saldo"
                )));
            }
        }

        let mut products = self.products.write().await;
        if let Some(product) = products
            .get_mut(&product_id)
            .filter(|p| p.tenant_id == tenant_id)
        {
            product.current_stock = new_stock;
            product.updated_at = Utc::now();
        }
        *self.updates_applied.write().await += 1;
        Ok(())
    }
}
