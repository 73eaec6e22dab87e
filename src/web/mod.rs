//! # Módulo Web — Interface HTTP do Motor
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ Axum Router (este módulo)                                │
//! │  ├── GET  /                 → painel HTML (Maud)         │
//! │  ├── GET  /status           → JSON: contagens            │
//! │  ├── GET  /concepts         → JSON: resumo dos conceitos │
//! │  ├── GET  /concepts/{name}  → JSON: detalhe ou 404       │
//! │  ├── GET  /relations        → JSON: relações e regras    │
//! │  ├── POST /infer            → JSON: confiança ou null    │
//! │  ├── POST /knowledge        → JSON: relatório de ingestão│
//! │  ├── POST /extract          → JSON: entidades do texto   │
//! │  └── POST /reset            → JSON: memos limpos         │
//! ├──────────────────────────────────────────────────────────┤
//! │ CorsLayer::permissive (tower-http)                       │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Submódulos
//!
//! | Módulo | Responsabilidade |
//! |--------|------------------|
//! | [`state`] | Estado compartilhado (`AppState`) |
//! | [`handlers`] | Handlers Axum e mapeamento de erros para status HTTP |
//! | [`templates`] | Templates Maud (HTML server-side) |

pub mod handlers;
pub mod state;
pub mod templates;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use state::AppState;

/// Cria o router Axum com todas as rotas da aplicação.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // ── Página HTML ───────────────────────────────────────
        .route("/", get(handlers::index))
        // ── Consultas ─────────────────────────────────────────
        .route("/status", get(handlers::status))
        .route("/concepts", get(handlers::list_concepts))
        .route("/concepts/{name}", get(handlers::concept_detail))
        .route("/relations", get(handlers::list_relations))
        // ── Operações ─────────────────────────────────────────
        .route("/infer", post(handlers::infer))
        .route("/knowledge", post(handlers::ingest_knowledge))
        .route("/extract", post(handlers::extract))
        .route("/reset", post(handlers::reset))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
