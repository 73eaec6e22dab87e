//! # Persistência — Salvamento e Carregamento do Motor em Disco
//!
//! Serializa a ontologia e o registro de instâncias do [`Engine`] como JSON
//! "pretty-printed".
//!
//! ## Estado derivado
//!
//! Nada que possa ser recalculado vai para o arquivo:
//!
//! | Não serializado | Reconstruído por |
//! |-----------------|------------------|
//! | contadores de alias, propriedades herdadas | `Ontology::rebuild` |
//! | visões derivadas de relações e regras | `Ontology::rebuild` |
//! | árvores de condição | re-parse de `(logic, salience)` |
//! | memos | começam vazios |
//! | fábricas | tabela `builtin::factory` pelo nome |
//!
//! ## ⚠️ Atomicidade
//!
//! A escrita **não é atômica**: um crash durante a escrita pode corromper
//! o arquivo.

use std::path::Path;

use anyhow::{Context, Result};

use crate::inference::Engine;

/// Salva o motor em `path`, criando o diretório pai se preciso.
pub fn save(engine: &Engine, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Falha ao criar diretório {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(engine).context("Falha ao serializar o motor")?;
    std::fs::write(path, json).with_context(|| format!("Falha ao escrever {}", path.display()))?;
    tracing::info!(path = %path.display(), "Ontologia salva");
    Ok(())
}

/// Carrega o motor de `path`; `None` se o arquivo não existe.
///
/// # Erros
///
/// Arquivo existente mas corrompido, incompatível, ou com condições que
/// não fazem mais parse.
pub fn load(path: &Path) -> Result<Option<Engine>> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "Nenhuma ontologia encontrada");
        return Ok(None);
    }
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Falha ao ler {}", path.display()))?;
    let mut engine: Engine = serde_json::from_str(&json)
        .with_context(|| format!("Falha ao desserializar {}", path.display()))?;
    engine
        .rebuild()
        .context("Falha ao reconstruir o estado derivado")?;
    let stats = engine.stats();
    tracing::info!(
        path = %path.display(),
        concepts = stats.concepts,
        relations = stats.relations,
        instances = stats.instances,
        "Ontologia carregada"
    );
    Ok(Some(engine))
}

/// Carrega de `path` ou devolve um motor vazio.
pub fn load_or_default(path: &Path) -> Result<Engine> {
    Ok(load(path)?.unwrap_or_default())
}
