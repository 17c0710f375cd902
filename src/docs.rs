// src/docs.rs

use utoipa::OpenApi;

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Contagens ---
        handlers::countings::create_counting,
        handlers::countings::list_countings,
        handlers::countings::get_counting,
        handlers::countings::start_counting,
        handlers::countings::complete_counting,
        handlers::countings::approve_counting,
        handlers::countings::reopen_counting,
        handlers::countings::extend_counting,
        handlers::countings::force_stop_counting,
        handlers::countings::submit_counted_item,
        handlers::countings::list_counted_items,

        // --- Link compartilhável ---
        handlers::countings::get_public_counting,
        handlers::countings::submit_public_counted_item,

        // --- Cadastros ---
        handlers::inventory::create_sector,
        handlers::inventory::list_sectors,
        handlers::inventory::create_product,
        handlers::inventory::list_products,
        handlers::inventory::list_product_movements,
    ),
    components(
        schemas(
            models::counting::Counting,
            models::counting::CountingStatus,
            models::counting::CountedItem,
            models::counting::CountingDisplay,
            models::counting::CountingDetail,
            models::counting::UrgencyTier,
            models::counting::ApprovalSummary,
            models::inventory::Sector,
            models::inventory::Product,
            models::inventory::StockMovement,
            models::inventory::StockMovementType,
            handlers::countings::CreateCountingPayload,
            handlers::countings::ExtendPayload,
            handlers::countings::SubmitItemPayload,
            handlers::inventory::CreateSectorPayload,
            handlers::inventory::CreateProductPayload,
        )
    ),
    tags(
        (name = "countings", description = "Ciclo de vida das contagens de estoque"),
        (name = "public", description = "Acesso do operador de campo via link compartilhável"),
        (name = "inventory", description = "Cadastros de setores e produtos"),
    )
)]
pub struct ApiDoc;
