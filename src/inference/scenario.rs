//! Cenários: vinculações de chaves (`%`, `@`, `#Nome`, `#[tag]Nome`) a valores.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::Value;
use crate::error::Result;
use crate::logic::{Reasoner, ScenarioKey};

/// Mapa chave de cenário → valor vinculado.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scenario {
    bindings: BTreeMap<ScenarioKey, Value>,
}

impl Scenario {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cenário base de uma regra: `% ↦ domain`, `@ ↦ target`.
    pub fn with_subjects(domain: Value, target: Value) -> Self {
        Self::new()
            .with(ScenarioKey::Domain, domain)
            .with(ScenarioKey::Target, target)
    }

    pub fn with(mut self, key: ScenarioKey, value: Value) -> Self {
        self.bind(key, value);
        self
    }

    pub fn bind(&mut self, key: ScenarioKey, value: Value) {
        self.bindings.insert(key, value);
    }

    pub fn get(&self, key: &ScenarioKey) -> Option<&Value> {
        self.bindings.get(key)
    }

    pub fn contains(&self, key: &ScenarioKey) -> bool {
        self.bindings.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ScenarioKey, &Value)> {
        self.bindings.iter()
    }
}

/// Produto cartesiano dos candidatos de cada chave ainda não vinculada em
/// `base`, em ordem de chave. Uma chave sem candidatos produz zero cenários.
pub fn enumerate<R: Reasoner + ?Sized>(
    base: &Scenario,
    keys: &BTreeSet<ScenarioKey>,
    reasoner: &R,
) -> Result<Vec<Scenario>> {
    let mut scenarios = vec![base.clone()];
    for key in keys.iter().filter(|k| !base.contains(k)) {
        let candidates = reasoner.candidates(key)?;
        scenarios = scenarios
            .iter()
            .flat_map(|s| {
                candidates
                    .iter()
                    .map(move |c| s.clone().with(key.clone(), c.clone()))
            })
            .collect();
        if scenarios.is_empty() {
            break;
        }
    }
    Ok(scenarios)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::eval::tests::{scenario, Fixture};

    #[test]
    fn product_skips_bound_keys() {
        let keys: BTreeSet<ScenarioKey> = [
            ScenarioKey::Domain,
            ScenarioKey::parameter("Language"),
            ScenarioKey::tagged("Language", "b"),
        ]
        .into_iter()
        .collect();
        let all = enumerate(&scenario(), &keys, &Fixture).unwrap();
        assert_eq!(all.len(), 4);
        assert!(all.iter().all(|s| s.len() == 4));
    }

    #[test]
    fn empty_candidates_yield_no_scenarios() {
        let keys: BTreeSet<ScenarioKey> = [ScenarioKey::parameter("Country")].into_iter().collect();
        assert!(enumerate(&scenario(), &keys, &Fixture).unwrap().is_empty());
    }
}
