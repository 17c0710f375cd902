// src/config.rs

use std::sync::Arc;
use std::{env, time::Duration};

use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{CountingRepository, CountingStore, InventoryRepository, InventoryStore},
    services::{CountingService, ReconciliationService},
};

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub counting_service: CountingService,
    pub inventory_store: Arc<dyn InventoryStore>,
    // Intervalo do timer de expiração automática
    pub sweep_interval: Duration,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL deve ser definida");
        let sweep_interval_secs = env::var("SWEEP_INTERVAL_SECONDS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(90);

        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // --- Monta o gráfico de dependências ---
        // Os services enxergam apenas o contrato abstrato dos stores;
        // o Postgres fica confinado aos repositórios.
        let counting_store: Arc<dyn CountingStore> =
            Arc::new(CountingRepository::new(db_pool.clone()));
        let inventory_store: Arc<dyn InventoryStore> =
            Arc::new(InventoryRepository::new(db_pool.clone()));

        let reconciliation_service =
            ReconciliationService::new(counting_store.clone(), inventory_store.clone());
        let counting_service = CountingService::new(counting_store, reconciliation_service);

        Ok(Self {
            db_pool,
            counting_service,
            inventory_store,
            sweep_interval: Duration::from_secs(sweep_interval_secs),
        })
    }
}
