//! # Relation — Esquema Nomeado Entre Grupos de Conceitos
//!
//! Uma [`Relation`] tem listas **paralelas** de grupos: `domains[i]` pareia
//! com `targets[i]`. A relação *vale entre* `d` e `t` se existe `i` com
//! `d ∈ domains[i]` e `t ∈ targets[i]` (visões derivadas).
//!
//! Cada [`ConceptGroup`] guarda nomes-base, que podem ainda não existir na
//! ontologia (parciais), e a visão derivada `bases ∪ descendentes`,
//! recalculada pela [`Ontology`](super::Ontology) a cada mudança no grafo.
//!
//! As regras ficam em ordem decrescente de confiança; empates preservam a
//! ordem de inserção.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::rule::Rule;

/// Grupo de conceitos de um lado da relação.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ConceptGroup {
    bases: BTreeSet<String>,
    #[serde(skip)]
    derived: BTreeSet<String>,
}

impl ConceptGroup {
    pub fn new<I, S>(bases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            bases: bases.into_iter().map(Into::into).collect(),
            derived: BTreeSet::new(),
        }
    }

    pub fn bases(&self) -> &BTreeSet<String> {
        &self.bases
    }

    pub fn derived(&self) -> &BTreeSet<String> {
        &self.derived
    }

    pub fn contains(&self, concept: &str) -> bool {
        self.derived.contains(concept)
    }

    /// Bases ainda não resolvidas (sem conceito correspondente).
    pub fn partials<'a>(&'a self, exists: impl Fn(&str) -> bool + 'a) -> impl Iterator<Item = &'a String> + 'a {
        self.bases.iter().filter(move |b| !exists(b.as_str()))
    }

    pub(crate) fn set_derived(&mut self, derived: BTreeSet<String>) {
        self.derived = derived;
    }
}

/// Relação nomeada com suas regras.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Relation {
    pub name: String,
    domains: Vec<ConceptGroup>,
    targets: Vec<ConceptGroup>,
    /// Quando verdadeiro, `d == t` nunca vale.
    #[serde(default)]
    pub differ: bool,
    #[serde(default)]
    rules: Vec<Rule>,
}

impl Relation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            domains: Vec::new(),
            targets: Vec::new(),
            differ: false,
            rules: Vec::new(),
        }
    }

    /// Acrescenta o par de grupos `(domínios, alvos)`.
    pub fn with_group<D, T, S1, S2>(mut self, domains: D, targets: T) -> Self
    where
        D: IntoIterator<Item = S1>,
        T: IntoIterator<Item = S2>,
        S1: Into<String>,
        S2: Into<String>,
    {
        self.domains.push(ConceptGroup::new(domains));
        self.targets.push(ConceptGroup::new(targets));
        self
    }

    pub fn distinct(mut self) -> Self {
        self.differ = true;
        self
    }

    /// Regras anexadas antes da inserção na ontologia são validadas lá.
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.insert_rule(rule);
        self
    }

    /// Pares `(domínio, alvo)` de grupos.
    pub fn groups(&self) -> impl Iterator<Item = (&ConceptGroup, &ConceptGroup)> {
        self.domains.iter().zip(self.targets.iter())
    }

    pub fn group_count(&self) -> usize {
        self.domains.len()
    }

    /// A relação vale entre os dois conceitos?
    pub fn between(&self, domain: &str, target: &str) -> bool {
        self.groups()
            .any(|(d, t)| d.contains(domain) && t.contains(target))
    }

    /// União das visões derivadas de domínio e de alvo.
    pub fn membership(&self) -> (BTreeSet<String>, BTreeSet<String>) {
        let collect = |groups: &[ConceptGroup]| {
            groups
                .iter()
                .flat_map(|g| g.derived.iter().cloned())
                .collect::<BTreeSet<_>>()
        };
        (collect(&self.domains), collect(&self.targets))
    }

    /// Regras em ordem decrescente de confiança.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn rule(&self, id: Uuid) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id == id)
    }

    pub(crate) fn rule_mut(&mut self, id: Uuid) -> Option<&mut Rule> {
        self.rules.iter_mut().find(|r| r.id == id)
    }

    pub(crate) fn rules_mut(&mut self) -> &mut Vec<Rule> {
        &mut self.rules
    }

    pub(crate) fn groups_mut(&mut self) -> impl Iterator<Item = &mut ConceptGroup> {
        self.domains.iter_mut().chain(self.targets.iter_mut())
    }

    pub(crate) fn insert_rule(&mut self, rule: Rule) {
        let at = self
            .rules
            .partition_point(|r| r.confidence() >= rule.confidence());
        self.rules.insert(at, rule);
    }

    pub(crate) fn remove_rule(&mut self, id: Uuid) -> Option<Rule> {
        let at = self.rules.iter().position(|r| r.id == id)?;
        Some(self.rules.remove(at))
    }

    /// Base declarada em algum grupo?
    pub fn declares(&self, concept: &str) -> bool {
        self.domains
            .iter()
            .chain(self.targets.iter())
            .any(|g| g.bases.contains(concept))
    }

    pub fn clear_memos(&self) {
        for rule in &self.rules {
            rule.clear_memo();
        }
    }
}
