//! # Concept — Nó Tipado da Ontologia
//!
//! Um [`Concept`] é um **tipo nomeado**: tem pais e filhos, aliases,
//! propriedades e uma categoria que controla a instanciação.
//!
//! ## Categorias
//!
//! | Categoria | Instâncias |
//! |-----------|------------|
//! | `Abstract` | Nenhuma — `instance()` falha com `InvariantViolation` |
//! | `Static` | Exatamente uma, canônica e compartilhada (nome = nome do conceito) |
//! | `Dynamic` | Zero ou mais, cada uma com cópia própria das propriedades |
//!
//! ## Herança
//!
//! Os aliases de um conceito são os próprios **∪** os de todos os
//! ancestrais. Cada alias herdado carrega um **contador**: quantos pais
//! vivos o contribuem. O alias só some quando o contador chega a zero.
//!
//! Propriedades seguem a mesma ideia, mas com valores: se pais diferentes
//! contribuem valores diferentes para a mesma chave, o filho guarda um
//! multiconjunto. Uma propriedade local sempre sombreia as herdadas.
//!
//! O estado herdado **não é serializado** — a [`Ontology`](super::Ontology)
//! o recalcula ao inserir o conceito e em toda mutação do grafo.
//!
//! ## Exemplo
//!
//! ```rust
//! use cognitive_core::core::{Category, Concept};
//!
//! let kieran = Concept::new("Kieran", Category::Static)
//!     .with_parent("Person")
//!     .with_alias("k");
//! assert!(kieran.parents().contains("Person"));
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::instance::FactoryHandle;
use super::value::{PropertyValue, Value};

/// Categoria de instanciação de um conceito.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Não pode ser instanciado.
    Abstract,
    /// Exatamente uma instância canônica.
    Static,
    /// Zero ou mais instâncias nomeadas.
    Dynamic,
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Category::Abstract => "abstract",
            Category::Static => "static",
            Category::Dynamic => "dynamic",
        }
    }
}

/// Nó tipado da ontologia.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Concept {
    /// Nome único na ontologia.
    pub name: String,

    pub category: Category,

    /// Nomes dos pais. Nomes ainda ausentes da ontologia ficam
    /// "pendentes" e são fundidos ao grafo quando o conceito chega.
    #[serde(default)]
    parents: BTreeSet<String>,

    #[serde(default)]
    children: BTreeSet<String>,

    /// Aliases declarados no próprio conceito.
    #[serde(default)]
    aliases: BTreeSet<String>,

    /// Propriedades definidas localmente.
    #[serde(default)]
    properties: BTreeMap<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    factory: Option<FactoryHandle>,

    /// alias → número de pais que o contribuem.
    #[serde(skip)]
    inherited_aliases: BTreeMap<String, usize>,

    /// chave → valores distintos herdados, cada um com seu contador.
    #[serde(skip)]
    inherited_properties: BTreeMap<String, Vec<(Value, usize)>>,

    /// relação → em quantos grupos/conjuntos de regra este conceito é membro.
    #[serde(skip)]
    relation_refs: BTreeMap<String, usize>,
}

impl Concept {
    pub fn new(name: impl Into<String>, category: Category) -> Self {
        Self {
            name: name.into(),
            category,
            parents: BTreeSet::new(),
            children: BTreeSet::new(),
            aliases: BTreeSet::new(),
            properties: BTreeMap::new(),
            factory: None,
            inherited_aliases: BTreeMap::new(),
            inherited_properties: BTreeMap::new(),
            relation_refs: BTreeMap::new(),
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parents.insert(parent.into());
        self
    }

    pub fn with_child(mut self, child: impl Into<String>) -> Self {
        self.children.insert(child.into());
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.insert(alias.into());
        self
    }

    /// Define uma propriedade local. Valores `Null` são recusados quando o
    /// conceito é inserido na ontologia.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_factory(mut self, factory: FactoryHandle) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn parents(&self) -> &BTreeSet<String> {
        &self.parents
    }

    pub fn children(&self) -> &BTreeSet<String> {
        &self.children
    }

    /// Aliases declarados aqui, sem os herdados.
    pub fn own_aliases(&self) -> &BTreeSet<String> {
        &self.aliases
    }

    /// Todos os aliases: próprios ∪ herdados.
    pub fn aliases(&self) -> BTreeSet<String> {
        self.aliases
            .iter()
            .chain(self.inherited_aliases.keys())
            .cloned()
            .collect()
    }

    /// Contador de herança de um alias (0 se não for herdado).
    pub fn alias_count(&self, alias: &str) -> usize {
        self.inherited_aliases.get(alias).copied().unwrap_or(0)
    }

    pub fn local_properties(&self) -> &BTreeMap<String, Value> {
        &self.properties
    }

    /// Valor efetivo de uma propriedade: local, senão herdado.
    pub fn property(&self, key: &str) -> Option<PropertyValue> {
        if let Some(value) = self.properties.get(key) {
            return Some(PropertyValue::Single(value.clone()));
        }
        let inherited = self.inherited_properties.get(key)?;
        match inherited.as_slice() {
            [] => None,
            [(value, _)] => Some(PropertyValue::Single(value.clone())),
            many => Some(PropertyValue::Multi(
                many.iter().map(|(v, _)| v.clone()).collect(),
            )),
        }
    }

    /// Todas as propriedades efetivas.
    pub fn properties(&self) -> BTreeMap<String, PropertyValue> {
        let keys: BTreeSet<&String> = self
            .properties
            .keys()
            .chain(self.inherited_properties.keys())
            .collect();
        keys.into_iter()
            .filter_map(|k| self.property(k).map(|v| (k.clone(), v)))
            .collect()
    }

    /// Propriedades achatadas em [`Value`], usadas para semear instâncias.
    pub fn seed_properties(&self) -> BTreeMap<String, Value> {
        self.properties()
            .into_iter()
            .map(|(k, v)| (k, v.to_value()))
            .collect()
    }

    /// Fábrica registrada (ou a padrão).
    pub fn factory(&self) -> FactoryHandle {
        self.factory.clone().unwrap_or_default()
    }

    pub fn has_custom_factory(&self) -> bool {
        self.factory.is_some()
    }

    /// Contadores de participação em relações.
    pub fn relation_refs(&self) -> &BTreeMap<String, usize> {
        &self.relation_refs
    }

    pub fn is_instantiable(&self) -> bool {
        self.category != Category::Abstract
    }

    // ─── Mutações internas (invariantes mantidos pela Ontology) ───

    pub(crate) fn parents_mut(&mut self) -> &mut BTreeSet<String> {
        &mut self.parents
    }

    pub(crate) fn children_mut(&mut self) -> &mut BTreeSet<String> {
        &mut self.children
    }

    pub(crate) fn aliases_mut(&mut self) -> &mut BTreeSet<String> {
        &mut self.aliases
    }

    pub(crate) fn properties_mut(&mut self) -> &mut BTreeMap<String, Value> {
        &mut self.properties
    }

    pub(crate) fn set_factory(&mut self, factory: Option<FactoryHandle>) {
        self.factory = factory;
    }

    pub(crate) fn set_inherited(
        &mut self,
        aliases: BTreeMap<String, usize>,
        properties: BTreeMap<String, Vec<(Value, usize)>>,
    ) -> bool {
        let changed = aliases != self.inherited_aliases || properties != self.inherited_properties;
        self.inherited_aliases = aliases;
        self.inherited_properties = properties;
        changed
    }

    pub(crate) fn set_relation_refs(&mut self, refs: BTreeMap<String, usize>) {
        self.relation_refs = refs;
    }
}

/// Acumula contribuições de um pai no estado herdado de um filho.
pub(crate) fn accumulate_contribution(
    parent: &Concept,
    aliases: &mut BTreeMap<String, usize>,
    properties: &mut BTreeMap<String, Vec<(Value, usize)>>,
) {
    for alias in parent.aliases() {
        *aliases.entry(alias).or_insert(0) += 1;
    }
    for (key, value) in parent.properties() {
        let slot = properties.entry(key).or_default();
        for v in value.values() {
            match slot.iter_mut().find(|(existing, _)| existing == v) {
                Some((_, count)) => *count += 1,
                None => slot.push((v.clone(), 1)),
            }
        }
    }
}
