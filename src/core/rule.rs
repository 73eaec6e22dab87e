//! # Rule — Asserção Ponderada Dentro de uma Relação
//!
//! Uma [`Rule`] afirma (ou refuta) que a relação vale entre os membros do
//! seu conjunto de domínio e os do seu conjunto de alvo, com uma
//! confiança em [0, 1]. Pode carregar [`Condition`]s na linguagem de
//! condições.
//!
//! ## Visões de membros
//!
//! Cada lado é um [`MemberSet`]: **bases** declaradas (conceitos ou
//! instâncias) e uma **visão derivada** mantida pela
//! [`Ontology`](super::Ontology):
//!
//! | Lado | Visão derivada |
//! |------|----------------|
//! | domínio | bases ∪ descendentes |
//! | alvo, com alguma condição citando `@` | bases ∪ descendentes |
//! | alvo, sem condição citando `@` | bases ∪ ancestrais |
//!
//! ## Memo
//!
//! O resultado por `(domínio, alvo)` fica num memo interno
//! (`parking_lot::Mutex`), vivo durante uma consulta de topo. Clonar uma
//! regra produz um memo vazio.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::instance::InstanceKey;
use super::value::Value;
use crate::error::{CognitiveError, Result};
use crate::logic::{parse, Node, ScenarioKey};

/// Sujeito de uma consulta ou membro de regra: um conceito ou uma instância.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    Concept(String),
    Instance(InstanceKey),
}

impl Subject {
    /// Nome do conceito (a instância devolve o conceito dela).
    pub fn concept_name(&self) -> &str {
        match self {
            Subject::Concept(name) => name,
            Subject::Instance(key) => &key.concept,
        }
    }

    pub fn instance(&self) -> Option<&InstanceKey> {
        match self {
            Subject::Instance(key) => Some(key),
            Subject::Concept(_) => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Subject::Concept(name) => Value::Concept(name.clone()),
            Subject::Instance(key) => Value::Instance(key.clone()),
        }
    }
}

impl From<&str> for Subject {
    fn from(name: &str) -> Self {
        Subject::Concept(name.to_string())
    }
}

impl From<String> for Subject {
    fn from(name: String) -> Self {
        Subject::Concept(name)
    }
}

impl From<InstanceKey> for Subject {
    fn from(key: InstanceKey) -> Self {
        Subject::Instance(key)
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Concept(name) => write!(f, "#{}", name),
            Subject::Instance(key) => write!(f, "{}", key),
        }
    }
}

/// Lado de uma regra.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Domain,
    Target,
}

/// Bases declaradas + visão derivada de conceitos.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MemberSet {
    bases: BTreeSet<Subject>,
    #[serde(skip)]
    derived: BTreeSet<String>,
}

impl MemberSet {
    pub fn bases(&self) -> &BTreeSet<Subject> {
        &self.bases
    }

    /// Conceitos da visão derivada.
    pub fn derived(&self) -> &BTreeSet<String> {
        &self.derived
    }

    /// Conceitos das bases (uma base-instância contribui seu conceito).
    pub fn base_concepts(&self) -> BTreeSet<String> {
        self.bases
            .iter()
            .map(|s| s.concept_name().to_string())
            .collect()
    }

    /// Pertinência com fallback instância → conceito.
    pub fn contains(&self, subject: &Subject) -> bool {
        match subject {
            Subject::Concept(name) => self.derived.contains(name),
            Subject::Instance(key) => {
                self.bases.contains(subject) || self.derived.contains(&key.concept)
            }
        }
    }

    pub(crate) fn insert_base(&mut self, subject: Subject) -> bool {
        self.bases.insert(subject)
    }

    pub(crate) fn remove_base(&mut self, subject: &Subject) -> bool {
        self.bases.remove(subject)
    }

    pub(crate) fn set_derived(&mut self, derived: BTreeSet<String>) {
        self.derived = derived;
    }
}

/// Forma serializada de uma condição: só o texto e a saliência.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConditionSpec {
    pub logic: String,
    pub salience: f64,
}

/// Expressão + saliência. A árvore é compilada na construção.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ConditionSpec", into = "ConditionSpec")]
pub struct Condition {
    logic: String,
    salience: f64,
    tree: Node,
}

impl Condition {
    /// Compila a condição.
    ///
    /// # Erros
    ///
    /// `MalformedLogic` vindo do parser; `InvariantViolation` se a
    /// saliência estiver fora de [0, 1].
    pub fn new(logic: impl Into<String>, salience: f64) -> Result<Self> {
        let logic = logic.into();
        if !(0.0..=1.0).contains(&salience) {
            return Err(CognitiveError::invariant(format!(
                "salience {} of '{}' is outside [0, 1]",
                salience, logic
            )));
        }
        let tree = parse(&logic)?;
        Ok(Self {
            logic,
            salience,
            tree,
        })
    }

    pub fn logic(&self) -> &str {
        &self.logic
    }

    pub fn salience(&self) -> f64 {
        self.salience
    }

    pub fn tree(&self) -> &Node {
        &self.tree
    }

    pub fn references_target(&self) -> bool {
        self.tree.references_target()
    }
}

impl TryFrom<ConditionSpec> for Condition {
    type Error = CognitiveError;

    fn try_from(spec: ConditionSpec) -> Result<Self> {
        Condition::new(spec.logic, spec.salience)
    }
}

impl From<Condition> for ConditionSpec {
    fn from(condition: Condition) -> Self {
        ConditionSpec {
            logic: condition.logic,
            salience: condition.salience,
        }
    }
}

/// Estado do memo para um par `(domínio, alvo)`.
#[derive(Clone, Copy, Debug)]
enum Memo {
    InProgress,
    Done(f64),
}

/// O que o motor deve fazer ao começar a avaliar uma regra.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum MemoState {
    /// Primeira visita: avaliar e depois chamar `memo_finish`.
    Fresh,
    /// Já calculado nesta consulta.
    Cached(f64),
    /// Reentrada na mesma avaliação: a regra não contribui.
    Reentrant,
}

/// Asserção ponderada de uma relação.
#[derive(Debug, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    domains: MemberSet,
    targets: MemberSet,
    confidence: f64,
    /// `true` = evidência a favor; `false` = evidência contra.
    pub supporting: bool,
    #[serde(default)]
    conditions: Vec<Condition>,
    #[serde(skip)]
    memo: Mutex<HashMap<(Subject, Subject), Memo>>,
}

impl Clone for Rule {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            domains: self.domains.clone(),
            targets: self.targets.clone(),
            confidence: self.confidence,
            supporting: self.supporting,
            conditions: self.conditions.clone(),
            memo: Mutex::new(HashMap::new()),
        }
    }
}

impl Rule {
    /// Regra de suporte sem membros nem condições. A confiança é limitada a [0, 1].
    pub fn new(confidence: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            domains: MemberSet::default(),
            targets: MemberSet::default(),
            confidence: confidence.clamp(0.0, 1.0),
            supporting: true,
            conditions: Vec::new(),
            memo: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_domain(mut self, member: impl Into<Subject>) -> Self {
        self.domains.insert_base(member.into());
        self
    }

    pub fn with_target(mut self, member: impl Into<Subject>) -> Self {
        self.targets.insert_base(member.into());
        self
    }

    /// Transforma em regra de refutação.
    pub fn refuting(mut self) -> Self {
        self.supporting = false;
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.insert_condition(condition);
        self
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn domains(&self) -> &MemberSet {
        &self.domains
    }

    pub fn targets(&self) -> &MemberSet {
        &self.targets
    }

    pub fn members(&self, side: Side) -> &MemberSet {
        match side {
            Side::Domain => &self.domains,
            Side::Target => &self.targets,
        }
    }

    /// Condições em ordem decrescente de saliência.
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_conditional(&self) -> bool {
        !self.conditions.is_empty()
    }

    /// Alguma condição cita `@`.
    pub fn is_conditional_on_target(&self) -> bool {
        self.conditions.iter().any(Condition::references_target)
    }

    /// União dos parâmetros livres das condições.
    pub fn free_parameters(&self) -> BTreeSet<ScenarioKey> {
        self.conditions
            .iter()
            .flat_map(|c| c.tree().free_parameters())
            .collect()
    }

    /// A regra se aplica ao par?
    pub fn applies(&self, domain: &Subject, target: &Subject) -> bool {
        self.domains.contains(domain) && self.targets.contains(target)
    }

    pub(crate) fn members_mut(&mut self, side: Side) -> &mut MemberSet {
        match side {
            Side::Domain => &mut self.domains,
            Side::Target => &mut self.targets,
        }
    }

    /// Inserção estável por saliência decrescente.
    pub(crate) fn insert_condition(&mut self, condition: Condition) {
        let at = self
            .conditions
            .partition_point(|c| c.salience >= condition.salience);
        self.conditions.insert(at, condition);
    }

    pub(crate) fn remove_condition(&mut self, index: usize) -> Option<Condition> {
        (index < self.conditions.len()).then(|| self.conditions.remove(index))
    }

    // ─── Memo ───

    pub(crate) fn memo_begin(&self, domain: &Subject, target: &Subject) -> MemoState {
        let mut memo = self.memo.lock();
        let key = (domain.clone(), target.clone());
        match memo.get(&key) {
            Some(Memo::Done(r)) => MemoState::Cached(*r),
            Some(Memo::InProgress) => MemoState::Reentrant,
            None => {
                memo.insert(key, Memo::InProgress);
                MemoState::Fresh
            }
        }
    }

    pub(crate) fn memo_finish(&self, domain: &Subject, target: &Subject, result: f64) {
        self.memo
            .lock()
            .insert((domain.clone(), target.clone()), Memo::Done(result));
    }

    /// Desfaz a marca `InProgress` após um erro.
    pub(crate) fn memo_abort(&self, domain: &Subject, target: &Subject) {
        self.memo.lock().remove(&(domain.clone(), target.clone()));
    }

    pub fn clear_memo(&self) {
        self.memo.lock().clear();
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = |set: &MemberSet| {
            set.bases()
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        write!(
            f,
            "{}{{{}}} → {{{}}} @ {:.2}",
            if self.supporting { "+" } else { "−" },
            side(&self.domains),
            side(&self.targets),
            self.confidence
        )?;
        for c in &self.conditions {
            write!(f, " [{} ×{}]", c.logic, c.salience)?;
        }
        Ok(())
    }
}
