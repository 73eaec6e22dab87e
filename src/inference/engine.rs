//! # Engine — Ontologia + Instâncias + Inferência Recursiva
//!
//! O [`Engine`] junta a [`Ontology`] e o [`InstanceRegistry`] e responde
//! consultas `infer(d, r, t)`.
//!
//! ## Procedimento
//!
//! ```text
//! infer(d, r, t)
//!   r.differ e d == t          → 0
//!   r não vale entre d e t     → 0
//!   para cada regra aplicável, em ordem decrescente de confiança:
//!     (condições desligadas e regra condicional → pula)
//!     r_i = avaliar(regra, d, t)
//!     combinar em Evidence (suporte / ceticismo)
//!   → Evidence::conclude()     (Known(c) ou Unknown)
//! ```
//!
//! ## Avaliação de uma regra
//!
//! Os parâmetros livres das condições geram o produto cartesiano de
//! cenários. Para cada cenário:
//!
//! ```text
//! erro_cenário = Σ (1 − c_k) × saliência_k      (curto-circuito em ≥ 1)
//! conf_cenário = confiança × (1 − erro_cenário)
//! erro_regra  *= (1 − conf_cenário)             (≤ 0 → devolve 1)
//! resultado    = 1 − erro_regra
//! ```
//!
//! O resultado é memorizado por `(regra, d, t)` durante a consulta de topo.
//! Reentrar numa avaliação em curso faz a regra não contribuir.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::registry::InstanceRegistry;
use super::scenario::{self, Scenario};
use crate::core::builtin;
use crate::core::rule::MemoState;
use crate::core::{
    Category, Concept, Evidence, FactoryHandle, Inference, Instance, InstanceKey, Ontology,
    Properties, Relation, Rule, Subject, Value,
};
use crate::error::{CognitiveError, Result};
use crate::logic::{evaluate, Reasoner, ScenarioKey};

/// Motor de inferência: dono da ontologia e das instâncias.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Engine {
    ontology: Ontology,
    registry: InstanceRegistry,
}

/// Contagens para a interface.
#[derive(Clone, Debug, Serialize)]
pub struct EngineStats {
    pub concepts: usize,
    pub relations: usize,
    pub rules: usize,
    pub instances: usize,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Motor sobre uma ontologia pronta; materializa os singletons estáticos.
    pub fn from_ontology(ontology: Ontology) -> Result<Self> {
        let mut engine = Self {
            ontology,
            registry: InstanceRegistry::new(),
        };
        engine.sync_statics()?;
        Ok(engine)
    }

    pub fn ontology(&self) -> &Ontology {
        &self.ontology
    }

    pub fn registry(&self) -> &InstanceRegistry {
        &self.registry
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            concepts: self.ontology.concepts().count(),
            relations: self.ontology.relations().count(),
            rules: self.ontology.relations().map(|r| r.rules().len()).sum(),
            instances: self.registry.len(),
        }
    }

    /// Aplica uma mutação arbitrária à ontologia e ressincroniza o registro
    /// (singletons estáticos novos, instâncias de conceitos removidos).
    pub fn update<T>(&mut self, f: impl FnOnce(&mut Ontology) -> Result<T>) -> Result<T> {
        let outcome = f(&mut self.ontology);
        let synced = self.sync_statics();
        self.reset();
        let value = outcome?;
        synced?;
        Ok(value)
    }

    /// Reconstrói o estado derivado após desserialização.
    pub fn rebuild(&mut self) -> Result<()> {
        self.ontology.rebuild();
        self.sync_statics()
    }

    fn sync_statics(&mut self) -> Result<()> {
        let orphans: Vec<String> = self
            .registry
            .concepts()
            .filter(|c| !self.ontology.contains_concept(c))
            .map(String::from)
            .collect();
        for concept in orphans {
            let dropped = self.registry.remove_concept(&concept);
            tracing::debug!(concept = %concept, dropped, "Engine: instâncias órfãs removidas");
        }
        let pending: Vec<String> = self
            .ontology
            .concepts()
            .filter(|c| c.category == Category::Static)
            .filter(|c| !self.registry.contains(&InstanceKey::singleton(&c.name)))
            .map(|c| c.name.clone())
            .collect();
        for concept in pending {
            self.materialize(&concept)?;
        }
        Ok(())
    }

    /// Cria (ou recria) o singleton de um conceito estático.
    fn materialize(&mut self, name: &str) -> Result<InstanceKey> {
        let concept = self
            .ontology
            .concept(name)
            .ok_or_else(|| CognitiveError::missing_concept(name))?;
        let instance = concept
            .factory()
            .factory()
            .create(name, name, concept.seed_properties())?;
        let key = instance.key.clone();
        self.registry.replace(instance);
        tracing::debug!(concept = %name, "Engine: singleton estático materializado");
        Ok(key)
    }

    // ─── Ontologia ───

    pub fn add_concept(&mut self, concept: Concept) -> Result<()> {
        self.update(|o| o.add_concept(concept))
    }

    pub fn remove_concept(&mut self, name: &str) -> Result<Concept> {
        self.update(|o| o.remove_concept(name))
    }

    pub fn add_relation(&mut self, relation: Relation) -> Result<()> {
        self.update(|o| o.add_relation(relation))
    }

    pub fn add_rule(&mut self, relation: &str, rule: Rule) -> Result<Uuid> {
        self.update(|o| o.add_rule(relation, rule))
    }

    /// Define uma propriedade de conceito. Instâncias já criadas mantêm a
    /// sua cópia, mas chaves ausentes nelas caem no valor do conceito.
    pub fn set_property(&mut self, concept: &str, key: &str, value: Value) -> Result<()> {
        self.update(|o| o.set_property(concept, key, value))
    }

    pub fn remove_property(&mut self, concept: &str, key: &str) -> Result<Option<Value>> {
        self.update(|o| o.remove_property(concept, key))
    }

    /// Instala um pacote built-in e materializa seus estáticos.
    pub fn import_builtin(&mut self, bundle: &str) -> Result<Vec<String>> {
        self.update(|o| o.import_builtin(bundle))
    }

    /// Troca a fábrica de um conceito; um estático recria o singleton.
    pub fn set_factory(&mut self, concept: &str, factory: FactoryHandle) -> Result<()> {
        self.ontology.set_factory(concept, Some(factory))?;
        let is_static = self
            .ontology
            .concept(concept)
            .is_some_and(|c| c.category == Category::Static);
        if is_static {
            self.registry.remove(&InstanceKey::singleton(concept));
            self.materialize(concept)?;
        }
        self.reset();
        Ok(())
    }

    // ─── Instâncias ───

    fn check_instantiable(&self, concept: &str, properties: &Properties) -> Result<&Concept> {
        let c = self.ontology.concept(concept).ok_or_else(|| {
            CognitiveError::invariant(format!("unknown concept '{}' for instance", concept))
        })?;
        match c.category {
            Category::Abstract => {
                return Err(CognitiveError::invariant(format!(
                    "abstract concept '{}' cannot be instantiated",
                    concept
                )))
            }
            Category::Static => {
                return Err(CognitiveError::invariant(format!(
                    "static concept '{}' already owns its single instance",
                    concept
                )))
            }
            Category::Dynamic => {}
        }
        if let Some((key, _)) = properties.iter().find(|(_, v)| **v == Value::Null) {
            return Err(CognitiveError::invariant(format!(
                "property '{}' of a '{}' instance is null",
                key, concept
            )));
        }
        Ok(c)
    }

    /// Registra uma instância pronta de um conceito dinâmico. Chaves
    /// ausentes são semeadas com as propriedades atuais do conceito.
    pub fn add_instance(&mut self, mut instance: Instance) -> Result<()> {
        let concept = self.check_instantiable(instance.concept(), &instance.properties)?;
        for (key, value) in concept.seed_properties() {
            instance.properties.entry(key).or_insert(value);
        }
        tracing::debug!(instance = %instance.key, "Engine: instância adicionada");
        self.registry.insert(instance)?;
        self.reset();
        Ok(())
    }

    /// Cria uma instância pela fábrica do conceito. Sem nome, usa um UUID.
    pub fn create_instance(
        &mut self,
        concept: &str,
        name: Option<&str>,
        properties: Properties,
    ) -> Result<InstanceKey> {
        let c = self.check_instantiable(concept, &properties)?;
        let name = name
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let mut seeded = c.seed_properties();
        seeded.extend(properties);
        let instance = c.factory().factory().create(concept, &name, seeded)?;
        let key = instance.key.clone();
        self.registry.insert(instance)?;
        tracing::debug!(instance = %key, "Engine: instância criada");
        self.reset();
        Ok(key)
    }

    pub fn instance(&self, key: &InstanceKey) -> Option<&Instance> {
        self.registry.get(key)
    }

    /// Acesso mutável a uma instância; as mudanças valem para consultas futuras.
    pub fn instance_mut(&mut self, key: &InstanceKey) -> Result<&mut Instance> {
        self.reset();
        self.registry
            .get_mut(key)
            .ok_or_else(|| CognitiveError::missing_instance(&key.to_string()))
    }

    /// Instâncias do conceito (e dos descendentes, se pedido).
    pub fn instances(&self, concept: &str, include_descendants: bool) -> Result<Vec<&Instance>> {
        if !self.ontology.contains_concept(concept) {
            return Err(CognitiveError::missing_concept(concept));
        }
        let mut concepts = vec![concept.to_string()];
        if include_descendants {
            concepts.extend(self.ontology.descendants(concept));
        }
        Ok(concepts
            .iter()
            .flat_map(|c| self.registry.of_concept(c))
            .collect())
    }

    /// Resolve uma referência textual.
    ///
    /// - `"Conceito"` → singleton (estático) ou o próprio conceito
    /// - `"Conceito:instancia"` → a instância
    /// - `"instancia"` → a primeira instância com esse nome
    pub fn resolve(&self, reference: &str) -> Result<Subject> {
        let reference = reference.trim();
        if self.ontology.contains_concept(reference) {
            return Ok(self.canonical(Subject::Concept(reference.to_string())));
        }
        if let Some(key) = InstanceKey::parse(reference) {
            return if self.registry.contains(&key) {
                Ok(Subject::Instance(key))
            } else {
                Err(CognitiveError::missing_instance(reference))
            };
        }
        self.registry
            .iter()
            .find(|i| i.name() == reference)
            .map(|i| Subject::Instance(i.key.clone()))
            .ok_or_else(|| CognitiveError::MissingReference {
                kind: "reference",
                name: reference.to_string(),
            })
    }

    /// Conceito estático vira seu singleton.
    fn canonical(&self, subject: Subject) -> Subject {
        if let Subject::Concept(name) = &subject {
            let key = InstanceKey::singleton(name);
            if self.registry.contains(&key) {
                return Subject::Instance(key);
            }
        }
        subject
    }

    fn check_subject(&self, subject: &Subject) -> Result<()> {
        match subject {
            Subject::Concept(name) if !self.ontology.contains_concept(name) => {
                Err(CognitiveError::missing_concept(name))
            }
            Subject::Instance(key) if !self.registry.contains(key) => {
                Err(CognitiveError::missing_instance(&key.to_string()))
            }
            _ => Ok(()),
        }
    }

    // ─── Inferência ───

    /// Limpa os memos de todas as regras.
    pub fn reset(&self) {
        self.ontology.clear_memos();
    }

    /// Confiança de que `relation(domain, target)` vale.
    ///
    /// Com `evaluate_conditions = false`, só regras sem condições contribuem.
    /// Cada chamada é uma consulta de topo: os memos começam vazios.
    ///
    /// # Erros
    ///
    /// `MissingReference` para relação, conceito ou instância inexistente;
    /// erros de avaliação das condições sobem sem alteração.
    pub fn infer(
        &mut self,
        domain: &Subject,
        relation: &str,
        target: &Subject,
        evaluate_conditions: bool,
    ) -> Result<Inference> {
        self.reset();
        let result = self.infer_subjects(domain, relation, target, evaluate_conditions)?;
        tracing::debug!(
            domain = %domain,
            relation = %relation,
            target = %target,
            result = %result,
            "Engine: inferência"
        );
        Ok(result)
    }

    fn infer_subjects(
        &self,
        domain: &Subject,
        relation: &str,
        target: &Subject,
        evaluate_conditions: bool,
    ) -> Result<Inference> {
        let rel = self
            .ontology
            .relation(relation)
            .ok_or_else(|| CognitiveError::missing_relation(relation))?;
        self.check_subject(domain)?;
        self.check_subject(target)?;
        let domain = self.canonical(domain.clone());
        let target = self.canonical(target.clone());

        if rel.differ && domain == target {
            return Ok(Inference::Known(0.0));
        }
        if !rel.between(domain.concept_name(), target.concept_name()) {
            return Ok(Inference::Known(0.0));
        }

        let mut evidence = Evidence::new();
        for rule in rel.rules() {
            if !rule.applies(&domain, &target) {
                continue;
            }
            if !evaluate_conditions && rule.is_conditional() {
                continue;
            }
            if let Some(r) = self.evaluate_rule(rule, &domain, &target)? {
                tracing::trace!(rule = %rule, result = r, "Engine: regra avaliada");
                evidence.add(r, rule.supporting);
            }
        }
        Ok(evidence.conclude())
    }

    /// `None` quando a avaliação reentra em si mesma.
    fn evaluate_rule(&self, rule: &Rule, domain: &Subject, target: &Subject) -> Result<Option<f64>> {
        match rule.memo_begin(domain, target) {
            MemoState::Cached(r) => return Ok(Some(r)),
            MemoState::Reentrant => return Ok(None),
            MemoState::Fresh => {}
        }
        match self.rule_confidence(rule, domain, target) {
            Ok(r) => {
                rule.memo_finish(domain, target, r);
                Ok(Some(r))
            }
            Err(e) => {
                rule.memo_abort(domain, target);
                Err(e)
            }
        }
    }

    fn rule_confidence(&self, rule: &Rule, domain: &Subject, target: &Subject) -> Result<f64> {
        let base = Scenario::with_subjects(domain.to_value(), target.to_value());
        let scenarios = scenario::enumerate(&base, &rule.free_parameters(), self)?;
        let mut rule_error = 1.0;
        for scenario in &scenarios {
            rule_error *= 1.0 - self.scenario_confidence(rule, scenario)?;
            if rule_error <= 0.0 {
                return Ok(1.0);
            }
        }
        Ok(1.0 - rule_error)
    }

    fn scenario_confidence(&self, rule: &Rule, scenario: &Scenario) -> Result<f64> {
        let mut error = 0.0;
        for condition in rule.conditions() {
            let c = evaluate(condition.tree(), scenario, self)?.as_confidence();
            error += (1.0 - c) * condition.salience();
            if error >= 1.0 {
                return Ok(0.0);
            }
        }
        Ok(rule.confidence() * (1.0 - error))
    }

    /// Sujeito designado por um valor da linguagem, se houver.
    fn subject_of(&self, value: &Value) -> Option<Subject> {
        match value {
            Value::Instance(key) if self.registry.contains(key) => Some(Subject::Instance(key.clone())),
            Value::Concept(name) if self.ontology.contains_concept(name) => {
                Some(self.canonical(Subject::Concept(name.clone())))
            }
            Value::Text(reference) => self.resolve(reference).ok(),
            _ => None,
        }
    }

    fn instance_value(&self, key: &InstanceKey, property: &str) -> Value {
        let Some(instance) = self.registry.get(key) else {
            return Value::Null;
        };
        if let Some(value) = instance.property(property) {
            return value.clone();
        }
        self.ontology
            .concept(&key.concept)
            .and_then(|c| c.property(property))
            .map(|p| p.to_value())
            .unwrap_or(Value::Null)
    }
}

impl Reasoner for Engine {
    fn infer_values(
        &self,
        domain: &Value,
        relation: &str,
        target: &Value,
        evaluate_conditions: bool,
    ) -> Result<Inference> {
        if self.ontology.relation(relation).is_none() {
            return Err(CognitiveError::missing_relation(relation));
        }
        match (self.subject_of(domain), self.subject_of(target)) {
            (Some(d), Some(t)) => self.infer_subjects(&d, relation, &t, evaluate_conditions),
            _ => Ok(Inference::Unknown),
        }
    }

    fn candidates(&self, key: &ScenarioKey) -> Result<Vec<Value>> {
        let ScenarioKey::Parameter { concept, .. } = key else {
            return Err(CognitiveError::ScenarioInconsistency(key.to_string()));
        };
        Ok(self
            .instances(concept, key.includes_descendants())?
            .into_iter()
            .map(|i| Value::Instance(i.key.clone()))
            .collect())
    }

    fn property(&self, subject: &Value, key: &str) -> Result<Value> {
        Ok(match subject {
            Value::Instance(instance) => self.instance_value(instance, key),
            Value::Concept(name) => self
                .ontology
                .concept(name)
                .and_then(|c| c.property(key))
                .map(|p| p.to_value())
                .unwrap_or(Value::Null),
            Value::Date(date) => builtin::date_property(*date, key),
            _ => Value::Null,
        })
    }

    fn call_method(&self, subject: &Value, method: &str, args: &[Value]) -> Result<Value> {
        match subject {
            Value::Null => Ok(Value::Null),
            Value::Date(date) => builtin::date_method(*date, method, args),
            Value::Instance(_) | Value::Concept(_) => {
                let Some(Subject::Instance(key)) = self.subject_of(subject) else {
                    return Err(CognitiveError::UnsupportedOperation(format!(
                        "'{}' has no instance to call {}() on",
                        subject, method
                    )));
                };
                let instance = self
                    .registry
                    .get(&key)
                    .ok_or_else(|| CognitiveError::missing_instance(&key.to_string()))?;
                let factory = self
                    .ontology
                    .concept(&key.concept)
                    .map(|c| c.factory())
                    .unwrap_or_default();
                factory.factory().method(instance, method, args)
            }
            other => Err(CognitiveError::UnsupportedOperation(format!(
                "{} has no method {}()",
                other, method
            ))),
        }
    }

    fn construct(&self, concept: &str, args: &[Value]) -> Result<Value> {
        let c = self
            .ontology
            .concept(concept)
            .ok_or_else(|| CognitiveError::missing_concept(concept))?;
        c.factory().factory().call(concept, args)
    }
}
