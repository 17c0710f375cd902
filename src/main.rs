//src/main.rs

use axum::{
    routing::{get, post, put},
    Router,
};
use tokio::net::TcpListener;
use utoipa_swagger_ui::SwaggerUi;

// Declaração dos nossos módulos
mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::AppState;
use utoipa::OpenApi;

#[tokio::main]
async fn main() {
    // Inicializa o logger
    tracing_subscriber::fmt().with_target(false).compact().init();

    // .expect() é bom aqui: se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new()
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    // Roda as migrações do SQLx na inicialização
    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("Falha ao rodar as migrações do banco de dados.");

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    // Timer de expiração automática: varre todas as contagens ativas vencidas,
    // independente de qualquer ação de usuário. A varredura é idempotente,
    // então conviver com a checagem pré-transição dos services é inofensivo.
    let sweeper = app_state.counting_service.clone();
    let sweep_interval = app_state.sweep_interval;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        loop {
            ticker.tick().await;
            match sweeper.sweep_expirations(None).await {
                Ok(0) => {}
                Ok(expired) => {
                    tracing::info!("Varredura: {} contagens expiradas", expired)
                }
                Err(e) => tracing::error!("Falha na varredura de expiração: {}", e),
            }
        }
    });

    // Rotas das contagens (back-office, escopadas por tenant)
    let counting_routes = Router::new()
        .route(
            "/",
            post(handlers::countings::create_counting).get(handlers::countings::list_countings),
        )
        .route("/{id}", get(handlers::countings::get_counting))
        .route("/{id}/start", post(handlers::countings::start_counting))
        .route("/{id}/complete", post(handlers::countings::complete_counting))
        .route("/{id}/approve", post(handlers::countings::approve_counting))
        .route("/{id}/reopen", post(handlers::countings::reopen_counting))
        .route("/{id}/extend", post(handlers::countings::extend_counting))
        .route(
            "/{id}/force-stop",
            post(handlers::countings::force_stop_counting),
        )
        .route(
            "/{id}/items",
            put(handlers::countings::submit_counted_item)
                .get(handlers::countings::list_counted_items),
        );

    // Rotas do link compartilhável (operador de campo, autenticado pelo token)
    let public_routes = Router::new()
        .route(
            "/countings/{token}",
            get(handlers::countings::get_public_counting),
        )
        .route(
            "/countings/{token}/items",
            put(handlers::countings::submit_public_counted_item),
        );

    // Cadastros de apoio
    let inventory_routes = Router::new()
        .route(
            "/sectors",
            post(handlers::inventory::create_sector).get(handlers::inventory::list_sectors),
        )
        .route(
            "/products",
            post(handlers::inventory::create_product).get(handlers::inventory::list_products),
        )
        .route(
            "/products/{id}/movements",
            get(handlers::inventory::list_product_movements),
        );

    // Combina tudo no router principal
    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/countings", counting_routes)
        .nest("/api/public", public_routes)
        .nest("/api/inventory", inventory_routes)
        .merge(
            SwaggerUi::new("/docs").url("/api-docs/openapi.json", docs::ApiDoc::openapi()),
        )
        .with_state(app_state);

    // Inicia o servidor
    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr().unwrap());
    axum::serve(listener, app)
        .await
        .expect("Erro no servidor Axum");
}
