//! # Ingestão de Conhecimento do Mundo
//!
//! Documentos anotados viram regras sem condições na relação anotada.
//!
//! | Classificação | Efeito |
//! |---------------|--------|
//! | `Positive` | regra de suporte com a confiança da anotação |
//! | `Negative` | regra de refutação com a confiança da anotação |
//! | `Insufficient` | ignorada |
//!
//! Cada entidade é mapeada para uma instância: conceito estático → seu
//! singleton; dinâmico → a instância com o nome da forma de superfície
//! (criada se ainda não existir); abstrato → erro.

use serde::{Deserialize, Serialize};

use super::engine::Engine;
use crate::core::{Category, InstanceKey, Properties, Rule, Subject};
use crate::error::{CognitiveError, Result};

/// Entidade reconhecida num texto.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Nome do conceito.
    pub class_type: String,
    /// Texto como aparece no documento.
    pub surface_form: String,
    #[serde(default = "full_confidence")]
    pub confidence: f64,
}

fn full_confidence() -> f64 {
    1.0
}

impl Entity {
    pub fn new(class_type: impl Into<String>, surface_form: impl Into<String>, confidence: f64) -> Self {
        Self {
            class_type: class_type.into(),
            surface_form: surface_form.into(),
            confidence,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Positive,
    Insufficient,
    Negative,
}

/// `relation(domain, target)` observada num documento.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Annotation {
    pub domain: Entity,
    pub relation: String,
    pub target: Entity,
    pub classification: Classification,
    pub confidence: f64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

/// Resumo de uma ingestão.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestionReport {
    pub documents: usize,
    pub rules_added: usize,
    pub skipped: usize,
    pub instances_created: usize,
}

impl Engine {
    /// Ingere documentos anotados. Os memos ficam limpos ao final, mesmo
    /// quando a ingestão falha.
    ///
    /// # Erros
    ///
    /// - `MissingReference` para relação ou conceito desconhecido
    /// - `InvariantViolation` para entidade de conceito abstrato
    ///
    /// As duas entidades de uma anotação são conferidas antes de qualquer
    /// instância ser criada, então uma anotação recusada não deixa rastro.
    /// Anotações anteriores à que falhou continuam aplicadas.
    pub fn add_world_knowledge<I>(&mut self, documents: I) -> Result<IngestionReport>
    where
        I: IntoIterator<Item = Document>,
    {
        let mut report = IngestionReport::default();
        let outcome = documents.into_iter().try_for_each(|document| {
            report.documents += 1;
            document
                .annotations
                .iter()
                .try_for_each(|annotation| self.ingest(annotation, &mut report))
        });
        self.reset();
        outcome?;
        tracing::info!(
            documents = report.documents,
            rules = report.rules_added,
            skipped = report.skipped,
            created = report.instances_created,
            "Conhecimento ingerido"
        );
        Ok(report)
    }

    fn ingest(&mut self, annotation: &Annotation, report: &mut IngestionReport) -> Result<()> {
        if annotation.classification == Classification::Insufficient {
            report.skipped += 1;
            return Ok(());
        }
        let relation = annotation.relation.as_str();
        let between = self
            .ontology()
            .relation(relation)
            .ok_or_else(|| CognitiveError::missing_relation(relation))?
            .between(&annotation.domain.class_type, &annotation.target.class_type);
        if !between {
            tracing::warn!(
                domain = %annotation.domain.class_type,
                relation = %relation,
                target = %annotation.target.class_type,
                "Anotação fora do esquema da relação, ignorada"
            );
            report.skipped += 1;
            return Ok(());
        }

        let domain_category = self.entity_category(&annotation.domain)?;
        let target_category = self.entity_category(&annotation.target)?;
        let domain = self.entity_instance(&annotation.domain, domain_category, report)?;
        let target = self.entity_instance(&annotation.target, target_category, report)?;
        let mut rule = Rule::new(annotation.confidence)
            .with_domain(Subject::Instance(domain))
            .with_target(Subject::Instance(target));
        if annotation.classification == Classification::Negative {
            rule = rule.refuting();
        }
        self.add_rule(relation, rule)?;
        report.rules_added += 1;
        Ok(())
    }

    fn entity_category(&self, entity: &Entity) -> Result<Category> {
        let category = self
            .ontology()
            .concept(&entity.class_type)
            .map(|c| c.category)
            .ok_or_else(|| CognitiveError::missing_concept(&entity.class_type))?;
        if category == Category::Abstract {
            return Err(CognitiveError::invariant(format!(
                "entity '{}' has abstract type '{}'",
                entity.surface_form, entity.class_type
            )));
        }
        Ok(category)
    }

    fn entity_instance(
        &mut self,
        entity: &Entity,
        category: Category,
        report: &mut IngestionReport,
    ) -> Result<InstanceKey> {
        if category == Category::Static {
            return Ok(InstanceKey::singleton(&entity.class_type));
        }
        let key = InstanceKey::new(&entity.class_type, &entity.surface_form);
        if self.instance(&key).is_none() {
            self.create_instance(&entity.class_type, Some(entity.surface_form.as_str()), Properties::new())?;
            report.instances_created += 1;
        }
        Ok(key)
    }
}
