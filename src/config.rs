//! # Configuração por Variáveis de Ambiente
//!
//! | Variável | Padrão | Significado |
//! |----------|--------|-------------|
//! | `COGNITIVE_ADDR` | `0.0.0.0:3000` | Endereço de bind do servidor HTTP |
//! | `COGNITIVE_ONTOLOGY` | `data/ontology.json` | Arquivo de persistência |
//! | `COGNITIVE_BUILTINS` | `time,email` | Pacotes built-in importados na partida |
//!
//! O nível de log continua vindo de `RUST_LOG` (lido pelo `EnvFilter` em `main`).

use std::path::PathBuf;

const DEFAULT_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_ONTOLOGY_PATH: &str = "data/ontology.json";
const DEFAULT_BUILTINS: &str = "time,email";

/// Configuração do binário.
#[derive(Clone, Debug)]
pub struct Config {
    /// Endereço TCP do servidor axum.
    pub addr: String,
    /// Caminho do JSON da ontologia persistida.
    pub ontology_path: PathBuf,
    /// Pacotes built-in a importar (ver [`crate::core::builtin`]).
    pub builtins: Vec<String>,
}

impl Config {
    /// Lê a configuração do ambiente, caindo nos padrões quando ausente.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Variante testável de [`from_env`](Config::from_env).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let addr = lookup("COGNITIVE_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let ontology_path = lookup("COGNITIVE_ONTOLOGY")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ONTOLOGY_PATH));
        let builtins = lookup("COGNITIVE_BUILTINS")
            .unwrap_or_else(|| DEFAULT_BUILTINS.to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        Self {
            addr,
            ontology_path,
            builtins,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
