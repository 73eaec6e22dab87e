//! # Instance — Valores dos Tipos da Ontologia
//!
//! Uma [`Instance`] é o par `(conceito, nome)` mais um mapa de propriedades.
//! Duas instâncias com o mesmo conceito e o mesmo nome **são a mesma
//! instância**; comparar uma instância com `&str` compara contra o nome.
//!
//! ## Fábricas
//!
//! Cada conceito pode registrar uma [`InstanceFactory`] — o equivalente a
//! uma "subclasse" de instância. A fábrica decide:
//!
//! - como criar instâncias (`create`), por exemplo validando o nome;
//! - o que o nó construtor `#Name(args)` devolve (`call`);
//! - quais métodos `X.metodo(args)` a instância expõe (`method`).
//!
//! As fábricas são serializadas **pelo nome** ([`FactoryHandle`]) e
//! religadas na carga através da tabela de fábricas built-in.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::builtin;
use super::value::{Properties, Value};
use crate::error::{CognitiveError, Result};

/// Identidade de uma instância: conceito + nome.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceKey {
    pub concept: String,
    pub name: String,
}

impl InstanceKey {
    pub fn new(concept: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            concept: concept.into(),
            name: name.into(),
        }
    }

    /// Chave da instância única de um conceito estático (nome = nome do conceito).
    pub fn singleton(concept: &str) -> Self {
        Self::new(concept, concept)
    }

    /// Lê o formato `Conceito:instancia`. Sem `:`, devolve `None`.
    pub fn parse(reference: &str) -> Option<Self> {
        let (concept, name) = reference.split_once(':')?;
        if concept.is_empty() || name.is_empty() {
            return None;
        }
        Some(Self::new(concept, name))
    }
}

impl fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.concept == self.name {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}:{}", self.concept, self.name)
        }
    }
}

/// Instância de um conceito.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Instance {
    pub key: InstanceKey,
    pub properties: Properties,
}

impl Instance {
    pub fn new(concept: impl Into<String>, name: impl Into<String>, properties: Properties) -> Self {
        Self {
            key: InstanceKey::new(concept, name),
            properties,
        }
    }

    pub fn concept(&self) -> &str {
        &self.key.concept
    }

    pub fn name(&self) -> &str {
        &self.key.name
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl PartialEq<str> for Instance {
    fn eq(&self, other: &str) -> bool {
        self.key.name == other
    }
}

/// Comportamento específico de instâncias de um conceito.
///
/// Todos os métodos têm implementação padrão; a [`DefaultFactory`] não
/// sobrescreve nenhum.
pub trait InstanceFactory: Send + Sync + fmt::Debug {
    /// Nome estável, usado na serialização.
    fn name(&self) -> &str;

    /// Cria uma instância. `properties` já vem semeado com as propriedades do conceito.
    fn create(&self, concept: &str, name: &str, properties: Properties) -> Result<Instance> {
        Ok(Instance::new(concept, name, properties))
    }

    /// Nó construtor `#Conceito(args...)`.
    fn call(&self, concept: &str, _args: &[Value]) -> Result<Value> {
        Err(CognitiveError::UnsupportedOperation(format!(
            "concept '{}' is not callable",
            concept
        )))
    }

    /// Chamada de método `X.metodo(args...)`.
    fn method(&self, instance: &Instance, method: &str, args: &[Value]) -> Result<Value> {
        generic_method(instance, method, args)
    }
}

/// Métodos disponíveis em qualquer instância.
///
/// - `name()` — nome da instância
/// - `concept()` — referência ao conceito
/// - `has(chave)` — se a propriedade existe
/// - `get(chave)` — valor da propriedade ou `null`
pub fn generic_method(instance: &Instance, method: &str, args: &[Value]) -> Result<Value> {
    match (method, args) {
        ("name", []) => Ok(Value::Text(instance.name().to_string())),
        ("concept", []) => Ok(Value::Concept(instance.concept().to_string())),
        ("has", [key]) => Ok(Value::Bool(
            key.as_text()
                .map(|k| instance.properties.contains_key(k))
                .unwrap_or(false),
        )),
        ("get", [key]) => Ok(key
            .as_text()
            .and_then(|k| instance.property(k))
            .cloned()
            .unwrap_or(Value::Null)),
        _ => Err(CognitiveError::UnsupportedOperation(format!(
            "instance '{}' has no method {}/{}",
            instance.key,
            method,
            args.len()
        ))),
    }
}

/// Fábrica padrão — instâncias simples sem comportamento extra.
#[derive(Debug, Default)]
pub struct DefaultFactory;

impl InstanceFactory for DefaultFactory {
    fn name(&self) -> &str {
        "default"
    }
}

/// Handle compartilhável de uma fábrica, serializado pelo nome.
#[derive(Clone)]
pub struct FactoryHandle(Arc<dyn InstanceFactory>);

impl FactoryHandle {
    pub fn new(factory: impl InstanceFactory + 'static) -> Self {
        Self(Arc::new(factory))
    }

    pub fn name(&self) -> &str {
        self.0.name()
    }

    pub fn factory(&self) -> &dyn InstanceFactory {
        self.0.as_ref()
    }
}

impl Default for FactoryHandle {
    fn default() -> Self {
        Self::new(DefaultFactory)
    }
}

impl fmt::Debug for FactoryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FactoryHandle({})", self.name())
    }
}

impl PartialEq for FactoryHandle {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

impl Serialize for FactoryHandle {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for FactoryHandle {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        builtin::factory(&name)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown instance factory '{}'", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_equality_is_by_concept_and_name() {
        let a = Instance::new("Person", "Kieran", Properties::new());
        let mut b = Instance::new("Person", "Kieran", Properties::new());
        b.properties.insert("age".into(), Value::Number(30.0));
        let c = Instance::new("Robot", "Kieran", Properties::new());
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a == *"Kieran");
    }

    #[test]
    fn key_parses_qualified_reference() {
        assert_eq!(
            InstanceKey::parse("Country:England"),
            Some(InstanceKey::new("Country", "England"))
        );
        assert_eq!(InstanceKey::parse("England"), None);
        assert_eq!(InstanceKey::singleton("England").to_string(), "England");
    }

    #[test]
    fn generic_methods() {
        let mut instance = Instance::new("Person", "Kieran", Properties::new());
        instance.properties.insert("age".into(), Value::Number(30.0));
        let f = DefaultFactory;
        assert_eq!(f.method(&instance, "name", &[]).unwrap(), Value::from("Kieran"));
        assert_eq!(
            f.method(&instance, "has", &[Value::from("age")]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            f.method(&instance, "get", &[Value::from("height")]).unwrap(),
            Value::Null
        );
        assert!(matches!(
            f.method(&instance, "fly", &[]),
            Err(CognitiveError::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn default_factory_is_not_callable() {
        assert!(DefaultFactory.call("Person", &[]).is_err());
    }
}
