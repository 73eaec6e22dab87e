//! # Estado da Aplicação Web
//!
//! O motor é síncrono; o servidor o compartilha atrás de um `RwLock`
//! (parking_lot). Leituras puras (listagens, extração) usam o read lock.
//! `infer` usa o write lock porque limpa e preenche os memos das regras.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::inference::Engine;

/// Estado compartilhado da aplicação Axum.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RwLock<Engine>>,
    /// Arquivo onde a ontologia é persistida após cada ingestão.
    pub ontology_path: Arc<PathBuf>,
}

impl AppState {
    pub fn new(engine: Engine, ontology_path: PathBuf) -> Self {
        Self {
            engine: Arc::new(RwLock::new(engine)),
            ontology_path: Arc::new(ontology_path),
        }
    }
}
