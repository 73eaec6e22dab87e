//! # Extrator de Entidades — Gazetteer sobre a Ontologia
//!
//! O [`EntityExtractor`] reconhece, em texto livre, os nomes que o motor já
//! conhece e devolve triplas [`Entity`] prontas para anotação.
//!
//! ## Formas de superfície
//!
//! | Origem | `class_type` | `surface_form` |
//! |--------|--------------|----------------|
//! | Nome de conceito estático/dinâmico | o conceito | o texto encontrado |
//! | Alias de conceito instanciável | o conceito | o texto encontrado |
//! | Nome de instância dinâmica | o conceito da instância | o nome da instância |
//!
//! Conceitos abstratos não são oferecidos: não têm instâncias.
//!
//! ## Confiança
//!
//! - `1.0` — nome encontrado com a mesma caixa
//! - `0.9` — caixa diferente, ou alias
//!
//! A busca é uma única alternação, sem distinção de caixa e com limites de
//! palavra, ordenada da forma mais longa para a mais curta.

use std::collections::{HashMap, HashSet};

use regex::{Regex, RegexBuilder};
use unicode_normalization::UnicodeNormalization;

use crate::core::Category;
use crate::inference::{Engine, Entity};

const EXACT: f64 = 1.0;
const LOOSE: f64 = 0.9;

#[derive(Clone, Debug)]
struct Surface {
    form: String,
    class_type: String,
    /// Nome canônico (e não alias).
    is_name: bool,
    /// Instância: a forma de superfície devolvida é sempre `form`.
    is_instance: bool,
}

/// Gazetteer construído a partir de um [`Engine`].
#[derive(Debug)]
pub struct EntityExtractor {
    pattern: Option<Regex>,
    /// forma em minúsculas → entradas
    surfaces: HashMap<String, Vec<Surface>>,
}

impl EntityExtractor {
    /// Coleta nomes, aliases e instâncias dinâmicas do motor.
    ///
    /// Falha apenas se a alternação exceder o limite de tamanho do `regex`.
    pub fn new(engine: &Engine) -> Result<Self, regex::Error> {
        let mut entries = Vec::new();
        for concept in engine.ontology().concepts() {
            if concept.category == Category::Abstract {
                continue;
            }
            entries.push(Surface {
                form: concept.name.clone(),
                class_type: concept.name.clone(),
                is_name: true,
                is_instance: false,
            });
            for alias in concept.aliases() {
                entries.push(Surface {
                    form: alias,
                    class_type: concept.name.clone(),
                    is_name: false,
                    is_instance: false,
                });
            }
        }
        for instance in engine.registry().iter() {
            let dynamic = engine
                .ontology()
                .concept(instance.concept())
                .is_some_and(|c| c.category == Category::Dynamic);
            if dynamic {
                entries.push(Surface {
                    form: instance.name().to_string(),
                    class_type: instance.concept().to_string(),
                    is_name: true,
                    is_instance: true,
                });
            }
        }

        let mut surfaces: HashMap<String, Vec<Surface>> = HashMap::new();
        for entry in entries {
            let form: String = entry.form.nfc().collect();
            if form.trim().is_empty() {
                continue;
            }
            surfaces
                .entry(form.to_lowercase())
                .or_default()
                .push(Surface { form, ..entry });
        }

        let mut forms: Vec<&String> = surfaces.keys().collect();
        forms.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then(a.cmp(b)));
        let pattern = if forms.is_empty() {
            None
        } else {
            let alternation = forms
                .iter()
                .map(|f| regex::escape(f))
                .collect::<Vec<_>>()
                .join("|");
            Some(
                RegexBuilder::new(&format!(r"\b(?:{})\b", alternation))
                    .case_insensitive(true)
                    .build()?,
            )
        };
        tracing::debug!(forms = surfaces.len(), "Gazetteer construído");
        Ok(Self { pattern, surfaces })
    }

    /// Número de formas de superfície conhecidas.
    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    /// Entidades encontradas em `text`, na ordem em que aparecem.
    pub fn extract(&self, text: &str) -> Vec<Entity> {
        let Some(pattern) = &self.pattern else {
            return Vec::new();
        };
        let text: String = text.nfc().collect();
        let mut seen = HashSet::new();
        let mut entities = Vec::new();
        for found in pattern.find_iter(&text) {
            let matched = found.as_str();
            let Some(candidates) = self.surfaces.get(&matched.to_lowercase()) else {
                continue;
            };
            for surface in candidates {
                let confidence = if surface.is_name && surface.form == matched {
                    EXACT
                } else {
                    LOOSE
                };
                let form = if surface.is_instance {
                    surface.form.clone()
                } else {
                    matched.to_string()
                };
                if seen.insert((surface.class_type.clone(), form.to_lowercase())) {
                    entities.push(Entity::new(surface.class_type.clone(), form, confidence));
                }
            }
        }
        entities
    }
}
