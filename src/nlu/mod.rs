//! # Módulo NLU — Fonte de Entidades
//!
//! Liga texto livre à ontologia: o [`EntityExtractor`] encontra no texto os
//! conceitos, aliases e instâncias que o motor conhece, e [`annotate`]
//! transforma pares de entidades num [`Document`] pronto para ingestão.
//!
//! ```text
//! texto ──NFC──► gazetteer ──► [Entity] ──annotate──► Document ──► Engine::add_world_knowledge
//! ```

pub mod extractor;

pub use extractor::EntityExtractor;

use crate::inference::{Annotation, Classification, Document, Engine, Entity};

/// Documento com uma anotação `relation` para cada par ordenado de
/// entidades distintas que a relação admite.
///
/// A confiança de cada anotação é o produto das confianças das entidades.
pub fn annotate(
    engine: &Engine,
    text: &str,
    entities: &[Entity],
    relation: &str,
    classification: Classification,
) -> Document {
    let Some(rel) = engine.ontology().relation(relation) else {
        tracing::warn!(relation = %relation, "Relação desconhecida, documento sem anotações");
        return Document {
            text: text.to_string(),
            annotations: Vec::new(),
        };
    };
    let mut annotations = Vec::new();
    for domain in entities {
        for target in entities {
            if domain == target || !rel.between(&domain.class_type, &target.class_type) {
                continue;
            }
            annotations.push(Annotation {
                domain: domain.clone(),
                relation: relation.to_string(),
                target: target.clone(),
                classification,
                confidence: domain.confidence * target.confidence,
            });
        }
    }
    Document {
        text: text.to_string(),
        annotations,
    }
}
