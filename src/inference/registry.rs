//! Registro de instâncias do motor.
//!
//! O registro é dono de todas as instâncias, agrupadas por conceito. Os
//! singletons de conceitos estáticos moram aqui, e não no conceito, então
//! dois motores coexistem com estáticos independentes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::{Instance, InstanceKey};
use crate::error::{CognitiveError, Result};

/// conceito → nome → instância.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct InstanceRegistry {
    instances: BTreeMap<String, BTreeMap<String, Instance>>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &InstanceKey) -> Option<&Instance> {
        self.instances.get(&key.concept)?.get(&key.name)
    }

    pub fn get_mut(&mut self, key: &InstanceKey) -> Option<&mut Instance> {
        self.instances.get_mut(&key.concept)?.get_mut(&key.name)
    }

    pub fn contains(&self, key: &InstanceKey) -> bool {
        self.get(key).is_some()
    }

    /// Insere; chave repetida é `InvariantViolation`.
    pub fn insert(&mut self, instance: Instance) -> Result<()> {
        let slot = self
            .instances
            .entry(instance.concept().to_string())
            .or_default();
        if slot.contains_key(instance.name()) {
            return Err(CognitiveError::invariant(format!(
                "instance '{}' already exists",
                instance.key
            )));
        }
        slot.insert(instance.name().to_string(), instance);
        Ok(())
    }

    /// Substitui (ou cria) a instância com a mesma chave.
    pub fn replace(&mut self, instance: Instance) -> Option<Instance> {
        self.instances
            .entry(instance.concept().to_string())
            .or_default()
            .insert(instance.name().to_string(), instance)
    }

    pub fn remove(&mut self, key: &InstanceKey) -> Option<Instance> {
        let slot = self.instances.get_mut(&key.concept)?;
        let removed = slot.remove(&key.name);
        if slot.is_empty() {
            self.instances.remove(&key.concept);
        }
        removed
    }

    /// Remove todas as instâncias de um conceito.
    pub fn remove_concept(&mut self, concept: &str) -> usize {
        self.instances.remove(concept).map(|m| m.len()).unwrap_or(0)
    }

    /// Instâncias de um único conceito, em ordem de nome.
    pub fn of_concept<'a>(&'a self, concept: &str) -> impl Iterator<Item = &'a Instance> + 'a {
        self.instances.get(concept).into_iter().flat_map(|m| m.values())
    }

    pub fn concepts(&self) -> impl Iterator<Item = &str> {
        self.instances.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instance> {
        self.instances.values().flat_map(|m| m.values())
    }

    pub fn len(&self) -> usize {
        self.instances.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Properties;

    #[test]
    fn insert_refuses_duplicates() {
        let mut registry = InstanceRegistry::new();
        registry
            .insert(Instance::new("Country", "England", Properties::new()))
            .unwrap();
        assert!(registry
            .insert(Instance::new("Country", "England", Properties::new()))
            .is_err());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn remove_drops_empty_concepts() {
        let mut registry = InstanceRegistry::new();
        let key = InstanceKey::new("Country", "England");
        registry
            .insert(Instance::new("Country", "England", Properties::new()))
            .unwrap();
        assert!(registry.remove(&key).is_some());
        assert!(registry.is_empty());
        assert_eq!(registry.of_concept("Country").count(), 0);
    }
}
