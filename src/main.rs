//! # Cognitive Core — Servidor
//!
//! Ponto de entrada do binário: carrega a ontologia persistida, importa os
//! pacotes built-in configurados e serve a API HTTP.
//!
//! ## Fluxo de Inicialização
//!
//! ```text
//! main()
//!   ├── Configura tracing/logging (RUST_LOG, padrão "info")
//!   ├── Lê Config do ambiente
//!   ├── Carrega a ontologia do disco (ou começa vazia)
//!   ├── Importa os pacotes built-in
//!   ├── Monta AppState e Router
//!   └── Serve em COGNITIVE_ADDR
//! ```
//!
//! ## Exemplo de Uso
//!
//! ```bash
//! RUST_LOG=debug COGNITIVE_ADDR=127.0.0.1:8080 cargo run
//! ```

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use cognitive_core::config::Config;
use cognitive_core::web::{self, state::AppState};
use cognitive_core::{persistence, Engine};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    tracing::info!(addr = %config.addr, ontology = %config.ontology_path.display(), "Cognitive Core — Starting...");

    // Arquivo corrompido não impede a partida: começa vazio e avisa.
    let mut engine = match persistence::load_or_default(&config.ontology_path) {
        Ok(engine) => engine,
        Err(e) => {
            tracing::warn!(error = %format!("{:#}", e), "Falha ao carregar a ontologia, iniciando vazia");
            Engine::new()
        }
    };

    for bundle in &config.builtins {
        match engine.import_builtin(bundle) {
            Ok(added) => tracing::info!(bundle = %bundle, added = added.len(), "Pacote built-in importado"),
            Err(e) => tracing::warn!(bundle = %bundle, error = %e, "Pacote built-in ignorado"),
        }
    }

    let state = AppState::new(engine, config.ontology_path.clone());
    let app = web::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.addr)
        .await
        .with_context(|| format!("Falha ao abrir {}", config.addr))?;
    tracing::info!("Server running at http://{}", config.addr);

    axum::serve(listener, app).await?;

    Ok(())
}
