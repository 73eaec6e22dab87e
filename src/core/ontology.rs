//! # Ontology — Contêiner de Conceitos e Relações
//!
//! A [`Ontology`] é dona exclusiva de todos os [`Concept`]s e
//! [`Relation`]s, indexados por nome (busca O(1)). As referências entre
//! eles são **nomes**, nunca ponteiros: pais, filhos, bases de grupos e
//! membros de regras. Isso torna `clone()` uma cópia profunda sem estado
//! mutável compartilhado.
//!
//! ## Propagação
//!
//! Toda mutação do grafo termina em duas etapas:
//!
//! 1. **Cascata de herança** — o conceito afetado e todos os seus
//!    descendentes recalculam aliases e propriedades herdados a partir dos
//!    pais resolvidos (contadores por alias e multiconjuntos por chave).
//! 2. **Atualização de relações** — cada grupo recalcula `bases ∪
//!    descendentes`; cada regra recalcula suas visões de domínio e alvo;
//!    os contadores de participação dos conceitos são refeitos; os memos
//!    são limpos.
//!
//! ## Nomes pendentes
//!
//! Um pai ou filho citado por nome antes de existir fica pendente. Quando
//! o conceito chega, as arestas são fundidas nos dois sentidos.
//!
//! ## Estado derivado
//!
//! Nada do estado derivado é serializado. Após desserializar, chame
//! [`rebuild()`](Ontology::rebuild).

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::builtin;
use super::concept::{accumulate_contribution, Concept};
use super::instance::FactoryHandle;
use super::relation::Relation;
use super::rule::{Condition, MemberSet, Rule, Side, Subject};
use super::value::Value;
use crate::error::{CognitiveError, Result};

/// Conceitos e relações por nome.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Ontology {
    concepts: HashMap<String, Concept>,
    relations: HashMap<String, Relation>,
}

fn missing_rule(relation: &str, id: Uuid) -> CognitiveError {
    CognitiveError::MissingReference {
        kind: "rule",
        name: format!("{}/{}", relation, id),
    }
}

impl Ontology {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Consultas ───

    pub fn concept(&self, name: &str) -> Option<&Concept> {
        self.concepts.get(name)
    }

    pub fn contains_concept(&self, name: &str) -> bool {
        self.concepts.contains_key(name)
    }

    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.get(name)
    }

    pub fn rule(&self, relation: &str, id: Uuid) -> Option<&Rule> {
        self.relations.get(relation)?.rule(id)
    }

    pub fn concepts(&self) -> impl Iterator<Item = &Concept> {
        self.concepts.values()
    }

    pub fn relations(&self) -> impl Iterator<Item = &Relation> {
        self.relations.values()
    }

    /// Nomes de conceitos em ordem alfabética.
    pub fn concept_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.concepts.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn relation_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.relations.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Fecho transitivo sobre pais resolvidos.
    pub fn ancestors(&self, name: &str) -> BTreeSet<String> {
        self.closure(name, |c| c.parents())
    }

    /// Fecho transitivo sobre filhos resolvidos.
    pub fn descendants(&self, name: &str) -> BTreeSet<String> {
        self.closure(name, |c| c.children())
    }

    fn closure<'a>(&'a self, name: &str, edges: impl Fn(&'a Concept) -> &'a BTreeSet<String>) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        let mut stack = vec![name.to_string()];
        while let Some(current) = stack.pop() {
            let Some(concept) = self.concepts.get(&current) else {
                continue;
            };
            for next in edges(concept) {
                if self.concepts.contains_key(next) && seen.insert(next.clone()) {
                    stack.push(next.clone());
                }
            }
        }
        seen.remove(name);
        seen
    }

    /// `concept` é `ancestor` ou descende dele?
    pub fn is_a(&self, concept: &str, ancestor: &str) -> bool {
        concept == ancestor || self.ancestors(concept).contains(ancestor)
    }

    /// Relações que valem entre os dois conceitos, por nome.
    pub fn find_relations(&self, domain: &str, target: &str) -> Vec<&Relation> {
        let mut found: Vec<&Relation> = self
            .relations
            .values()
            .filter(|r| r.between(domain, target))
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        found
    }

    // ─── Conceitos ───

    /// Insere um conceito, funde nomes pendentes e propaga.
    ///
    /// # Erros
    ///
    /// `InvariantViolation` para nome duplicado, propriedade `Null` ou
    /// aresta que fecharia um ciclo.
    pub fn add_concept(&mut self, mut concept: Concept) -> Result<()> {
        let name = concept.name.clone();
        if self.concepts.contains_key(&name) {
            return Err(CognitiveError::invariant(format!(
                "concept '{}' already exists",
                name
            )));
        }
        if let Some((key, _)) = concept
            .local_properties()
            .iter()
            .find(|(_, v)| **v == Value::Null)
        {
            return Err(CognitiveError::invariant(format!(
                "property '{}' of '{}' is null",
                key, name
            )));
        }
        for other in self.concepts.values() {
            if other.parents().contains(&name) {
                concept.children_mut().insert(other.name.clone());
            }
            if other.children().contains(&name) {
                concept.parents_mut().insert(other.name.clone());
            }
        }

        let mut above: BTreeSet<String> = BTreeSet::new();
        for parent in concept.parents().iter().filter(|p| self.concepts.contains_key(*p)) {
            above.insert(parent.clone());
            above.extend(self.ancestors(parent));
        }
        if concept.parents().contains(&name)
            || concept.children().contains(&name)
            || concept.children().iter().any(|c| above.contains(c))
        {
            return Err(CognitiveError::invariant(format!(
                "concept '{}' would close an inheritance cycle",
                name
            )));
        }

        for parent in concept.parents() {
            if let Some(p) = self.concepts.get_mut(parent) {
                p.children_mut().insert(name.clone());
            }
        }
        for child in concept.children() {
            if let Some(c) = self.concepts.get_mut(child) {
                c.parents_mut().insert(name.clone());
            }
        }
        tracing::debug!(
            concept = %name,
            category = concept.category.label(),
            parents = concept.parents().len(),
            "Ontology: conceito adicionado"
        );
        self.concepts.insert(name.clone(), concept);
        self.propagate(&name);
        Ok(())
    }

    /// Remove um conceito e suas arestas.
    ///
    /// # Erros
    ///
    /// `MissingReference` se não existir; `InvariantViolation` se alguma
    /// relação ou regra o declara como base.
    pub fn remove_concept(&mut self, name: &str) -> Result<Concept> {
        if !self.concepts.contains_key(name) {
            return Err(CognitiveError::missing_concept(name));
        }
        let mut holders: Vec<&str> = self
            .relations
            .values()
            .filter(|r| {
                r.declares(name)
                    || r.rules().iter().any(|rule| {
                        rule.domains().base_concepts().contains(name)
                            || rule.targets().base_concepts().contains(name)
                    })
            })
            .map(|r| r.name.as_str())
            .collect();
        if !holders.is_empty() {
            holders.sort_unstable();
            return Err(CognitiveError::invariant(format!(
                "concept '{}' is a declared member of relation(s) {}",
                name,
                holders.join(", ")
            )));
        }
        let concept = self
            .concepts
            .remove(name)
            .ok_or_else(|| CognitiveError::missing_concept(name))?;
        for parent in concept.parents() {
            if let Some(p) = self.concepts.get_mut(parent) {
                p.children_mut().remove(name);
            }
        }
        for child in concept.children() {
            if let Some(c) = self.concepts.get_mut(child) {
                c.parents_mut().remove(name);
            }
        }
        for child in concept.children() {
            self.cascade(child);
        }
        self.refresh_relations();
        tracing::debug!(concept = %name, "Ontology: conceito removido");
        Ok(concept)
    }

    /// Acrescenta a aresta `child → parent`. O pai pode ainda não existir.
    pub fn add_parent(&mut self, child: &str, parent: &str) -> Result<bool> {
        if !self.concepts.contains_key(child) {
            return Err(CognitiveError::missing_concept(child));
        }
        if child == parent || self.descendants(child).contains(parent) {
            return Err(CognitiveError::invariant(format!(
                "'{}' → '{}' would close an inheritance cycle",
                child, parent
            )));
        }
        let inserted = self.concept_mut(child)?.parents_mut().insert(parent.to_string());
        if let Some(p) = self.concepts.get_mut(parent) {
            p.children_mut().insert(child.to_string());
        }
        if inserted {
            tracing::debug!(child = %child, parent = %parent, "Ontology: aresta adicionada");
            self.propagate(child);
        }
        Ok(inserted)
    }

    /// Remove a aresta `child → parent`.
    pub fn remove_parent(&mut self, child: &str, parent: &str) -> Result<bool> {
        let removed = self.concept_mut(child)?.parents_mut().remove(parent);
        if let Some(p) = self.concepts.get_mut(parent) {
            p.children_mut().remove(child);
        }
        if removed {
            tracing::debug!(child = %child, parent = %parent, "Ontology: aresta removida");
            self.propagate(child);
        }
        Ok(removed)
    }

    pub fn add_alias(&mut self, concept: &str, alias: &str) -> Result<bool> {
        let inserted = self.concept_mut(concept)?.aliases_mut().insert(alias.to_string());
        if inserted {
            self.propagate(concept);
        }
        Ok(inserted)
    }

    pub fn remove_alias(&mut self, concept: &str, alias: &str) -> Result<bool> {
        let removed = self.concept_mut(concept)?.aliases_mut().remove(alias);
        if removed {
            self.propagate(concept);
        }
        Ok(removed)
    }

    /// Define uma propriedade local; `Null` é recusado.
    pub fn set_property(&mut self, concept: &str, key: &str, value: Value) -> Result<()> {
        if value == Value::Null {
            return Err(CognitiveError::invariant(format!(
                "property '{}' of '{}' is null",
                key, concept
            )));
        }
        self.concept_mut(concept)?
            .properties_mut()
            .insert(key.to_string(), value);
        self.propagate(concept);
        Ok(())
    }

    /// Remove uma propriedade local; o valor herdado, se houver, volta a valer.
    pub fn remove_property(&mut self, concept: &str, key: &str) -> Result<Option<Value>> {
        let removed = self.concept_mut(concept)?.properties_mut().remove(key);
        if removed.is_some() {
            self.propagate(concept);
        }
        Ok(removed)
    }

    pub(crate) fn set_factory(&mut self, concept: &str, factory: Option<FactoryHandle>) -> Result<()> {
        self.concept_mut(concept)?.set_factory(factory);
        Ok(())
    }

    fn concept_mut(&mut self, name: &str) -> Result<&mut Concept> {
        self.concepts
            .get_mut(name)
            .ok_or_else(|| CognitiveError::missing_concept(name))
    }

    fn propagate(&mut self, name: &str) {
        self.cascade(name);
        self.refresh_relations();
    }

    /// Recalcula o estado herdado de `name` e de todos os descendentes.
    fn cascade(&mut self, name: &str) {
        let mut path = Vec::new();
        self.cascade_from(name, &mut path);
    }

    fn cascade_from(&mut self, name: &str, path: &mut Vec<String>) {
        if path.iter().any(|p| p == name) {
            return;
        }
        let Some(concept) = self.concepts.get(name) else {
            return;
        };
        let mut aliases = BTreeMap::new();
        let mut properties = BTreeMap::new();
        for parent in concept.parents() {
            if let Some(p) = self.concepts.get(parent) {
                accumulate_contribution(p, &mut aliases, &mut properties);
            }
        }
        let children: Vec<String> = concept.children().iter().cloned().collect();
        if let Some(concept) = self.concepts.get_mut(name) {
            concept.set_inherited(aliases, properties);
        }
        path.push(name.to_string());
        for child in children {
            self.cascade_from(&child, path);
        }
        path.pop();
    }

    // ─── Relações ───

    /// Insere uma relação, calculando as visões e validando as regras já anexadas.
    pub fn add_relation(&mut self, mut relation: Relation) -> Result<()> {
        if self.relations.contains_key(&relation.name) {
            return Err(CognitiveError::invariant(format!(
                "relation '{}' already exists",
                relation.name
            )));
        }
        self.refresh_relation(&mut relation);
        for rule in relation.rules() {
            self.validate_members(&relation, rule.domains(), rule.targets())?;
        }
        tracing::debug!(
            relation = %relation.name,
            groups = relation.group_count(),
            rules = relation.rules().len(),
            "Ontology: relação adicionada"
        );
        self.relations.insert(relation.name.clone(), relation);
        self.recount_relation_refs();
        self.clear_memos();
        Ok(())
    }

    pub fn remove_relation(&mut self, name: &str) -> Result<Relation> {
        let relation = self
            .relations
            .remove(name)
            .ok_or_else(|| CognitiveError::missing_relation(name))?;
        self.recount_relation_refs();
        self.clear_memos();
        Ok(relation)
    }

    /// Acrescenta uma regra, mantendo a ordem por confiança.
    ///
    /// # Erros
    ///
    /// `MissingReference` para relação inexistente; `UnsupportedOperation`
    /// se um membro cita conceito não resolvido; `InvariantViolation` se um
    /// membro está fora da relação.
    pub fn add_rule(&mut self, relation: &str, mut rule: Rule) -> Result<Uuid> {
        let owner = self
            .relations
            .get(relation)
            .ok_or_else(|| CognitiveError::missing_relation(relation))?;
        self.validate_members(owner, rule.domains(), rule.targets())?;
        self.refresh_rule(&mut rule);
        let id = rule.id;
        tracing::debug!(relation = %relation, rule = %rule, "Ontology: regra adicionada");
        if let Some(owner) = self.relations.get_mut(relation) {
            owner.insert_rule(rule);
        }
        self.recount_relation_refs();
        self.clear_memos();
        Ok(id)
    }

    pub fn remove_rule(&mut self, relation: &str, id: Uuid) -> Result<Rule> {
        let rule = self
            .relations
            .get_mut(relation)
            .ok_or_else(|| CognitiveError::missing_relation(relation))?
            .remove_rule(id)
            .ok_or_else(|| missing_rule(relation, id))?;
        self.recount_relation_refs();
        self.clear_memos();
        Ok(rule)
    }

    /// Acrescenta uma condição; citar `@` expande o alvo da regra para descendentes.
    pub fn add_condition(&mut self, relation: &str, id: Uuid, condition: Condition) -> Result<()> {
        self.with_rule(relation, id, |rule| {
            rule.insert_condition(condition);
            Ok(())
        })
    }

    /// Remove a condição na posição `index`; sem condições com `@`, o alvo contrai.
    pub fn remove_condition(&mut self, relation: &str, id: Uuid, index: usize) -> Result<Condition> {
        self.with_rule(relation, id, |rule| {
            rule.remove_condition(index).ok_or_else(|| {
                CognitiveError::MissingReference {
                    kind: "condition",
                    name: format!("{}/{}#{}", relation, id, index),
                }
            })
        })
    }

    /// Acrescenta uma base a um lado da regra.
    pub fn add_rule_member(&mut self, relation: &str, id: Uuid, side: Side, member: Subject) -> Result<bool> {
        let owner = self
            .relations
            .get(relation)
            .ok_or_else(|| CognitiveError::missing_relation(relation))?;
        let mut probe = MemberSet::default();
        probe.insert_base(member.clone());
        match side {
            Side::Domain => self.validate_members(owner, &probe, &MemberSet::default())?,
            Side::Target => self.validate_members(owner, &MemberSet::default(), &probe)?,
        }
        self.with_rule(relation, id, |rule| Ok(rule.members_mut(side).insert_base(member)))
    }

    pub fn remove_rule_member(&mut self, relation: &str, id: Uuid, side: Side, member: &Subject) -> Result<bool> {
        if !self.concepts.contains_key(member.concept_name()) {
            return Err(CognitiveError::UnsupportedOperation(format!(
                "rule member '{}' was never resolved",
                member
            )));
        }
        self.with_rule(relation, id, |rule| Ok(rule.members_mut(side).remove_base(member)))
    }

    /// Aplica `f` a uma regra e refaz suas visões.
    fn with_rule<T>(&mut self, relation: &str, id: Uuid, f: impl FnOnce(&mut Rule) -> Result<T>) -> Result<T> {
        let mut owner = self
            .relations
            .remove(relation)
            .ok_or_else(|| CognitiveError::missing_relation(relation))?;
        let result = match owner.rule_mut(id) {
            Some(rule) => f(rule).map(|value| {
                self.refresh_rule(rule);
                value
            }),
            None => Err(missing_rule(relation, id)),
        };
        self.relations.insert(relation.to_string(), owner);
        self.recount_relation_refs();
        self.clear_memos();
        result
    }

    fn validate_members(&self, relation: &Relation, domains: &MemberSet, targets: &MemberSet) -> Result<()> {
        let (domain_view, target_view) = relation.membership();
        for (side, set, view) in [
            ("domain", domains, &domain_view),
            ("target", targets, &target_view),
        ] {
            for member in set.bases() {
                let concept = member.concept_name();
                if !self.concepts.contains_key(concept) {
                    return Err(CognitiveError::UnsupportedOperation(format!(
                        "rule {} member '{}' names the unresolved concept '{}'",
                        side, member, concept
                    )));
                }
                if !view.contains(concept) {
                    return Err(CognitiveError::invariant(format!(
                        "rule {} member '{}' is outside relation '{}'",
                        side, member, relation.name
                    )));
                }
            }
        }
        Ok(())
    }

    fn expand(&self, bases: impl IntoIterator<Item = String>, downwards: bool) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        for base in bases {
            if !self.concepts.contains_key(&base) {
                continue;
            }
            if downwards {
                out.extend(self.descendants(&base));
            } else {
                out.extend(self.ancestors(&base));
            }
            out.insert(base);
        }
        out
    }

    fn concept_bases(set: &MemberSet) -> Vec<String> {
        set.bases()
            .iter()
            .filter_map(|s| match s {
                Subject::Concept(name) => Some(name.clone()),
                Subject::Instance(_) => None,
            })
            .collect()
    }

    fn refresh_rule(&self, rule: &mut Rule) {
        let domain = self.expand(Self::concept_bases(rule.domains()), true);
        let target = self.expand(
            Self::concept_bases(rule.targets()),
            rule.is_conditional_on_target(),
        );
        rule.members_mut(Side::Domain).set_derived(domain);
        rule.members_mut(Side::Target).set_derived(target);
    }

    fn refresh_relation(&self, relation: &mut Relation) {
        for group in relation.groups_mut() {
            let derived = self.expand(group.bases().iter().cloned(), true);
            group.set_derived(derived);
        }
        for rule in relation.rules_mut() {
            self.refresh_rule(rule);
        }
    }

    fn refresh_relations(&mut self) {
        let mut relations = std::mem::take(&mut self.relations);
        for relation in relations.values_mut() {
            self.refresh_relation(relation);
        }
        self.relations = relations;
        self.recount_relation_refs();
        self.clear_memos();
    }

    /// Refaz, em cada conceito, o contador de participação por relação.
    fn recount_relation_refs(&mut self) {
        let mut counts: HashMap<String, BTreeMap<String, usize>> = HashMap::new();
        for relation in self.relations.values() {
            let mut bump = |concept: &str| {
                *counts
                    .entry(concept.to_string())
                    .or_default()
                    .entry(relation.name.clone())
                    .or_insert(0) += 1;
            };
            for (d, t) in relation.groups() {
                d.derived().iter().chain(t.derived()).for_each(|c| bump(c.as_str()));
            }
            for rule in relation.rules() {
                for c in rule
                    .domains()
                    .base_concepts()
                    .iter()
                    .chain(rule.targets().base_concepts().iter())
                {
                    bump(c.as_str());
                }
            }
        }
        for concept in self.concepts.values_mut() {
            concept.set_relation_refs(counts.remove(&concept.name).unwrap_or_default());
        }
    }

    pub fn clear_memos(&self) {
        for relation in self.relations.values() {
            relation.clear_memos();
        }
    }

    // ─── Ciclo de vida ───

    /// Instala um pacote built-in. Idempotente; devolve os conceitos novos.
    pub fn import_builtin(&mut self, bundle: &str) -> Result<Vec<String>> {
        builtin::install(self, bundle)
    }

    /// Reconstrói todo o estado derivado (após desserialização).
    pub fn rebuild(&mut self) {
        let roots: Vec<String> = self
            .concepts
            .values()
            .filter(|c| !c.parents().iter().any(|p| self.concepts.contains_key(p)))
            .map(|c| c.name.clone())
            .collect();
        for root in &roots {
            self.cascade(root);
        }
        self.refresh_relations();
        tracing::debug!(
            concepts = self.concepts.len(),
            relations = self.relations.len(),
            "Ontology: estado derivado reconstruído"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Category;

    fn people() -> Ontology {
        let mut o = Ontology::new();
        o.add_concept(Concept::new("Person", Category::Abstract).with_alias("p"))
            .unwrap();
        o.add_concept(
            Concept::new("Kieran", Category::Static)
                .with_parent("Person")
                .with_alias("k"),
        )
        .unwrap();
        o.add_concept(Concept::new("Language", Category::Abstract)).unwrap();
        o.add_concept(Concept::new("English", Category::Static).with_parent("Language"))
            .unwrap();
        o
    }

    fn names(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    /// Remover um alias do pai some com ele no filho
    #[test]
    fn alias_cascade() {
        let mut o = people();
        assert_eq!(o.concept("Kieran").unwrap().aliases(), names(&["k", "p"]));
        o.remove_alias("Person", "p").unwrap();
        assert_eq!(o.concept("Kieran").unwrap().aliases(), names(&["k"]));
    }

    /// Alias contribuído por dois ancestrais sobrevive à perda de um
    #[test]
    fn alias_survives_while_contributed() {
        let mut o = people();
        o.add_concept(Concept::new("Human", Category::Abstract).with_alias("p"))
            .unwrap();
        o.add_parent("Kieran", "Human").unwrap();
        assert_eq!(o.concept("Kieran").unwrap().alias_count("p"), 2);
        o.remove_alias("Person", "p").unwrap();
        assert!(o.concept("Kieran").unwrap().aliases().contains("p"));
    }

    #[test]
    fn add_then_remove_parent_is_neutral() {
        let mut o = people();
        o.add_concept(
            Concept::new("Robot", Category::Abstract)
                .with_alias("r")
                .with_property("legs", 4.0),
        )
        .unwrap();
        let before = o.concept("Kieran").unwrap().clone();
        o.add_parent("Kieran", "Robot").unwrap();
        assert!(o.concept("Kieran").unwrap().aliases().contains("r"));
        o.remove_parent("Kieran", "Robot").unwrap();
        let after = o.concept("Kieran").unwrap();
        assert_eq!(after.aliases(), before.aliases());
        assert_eq!(after.properties(), before.properties());
    }

    /// Filho citado antes do pai existir é fundido quando o pai chega
    #[test]
    fn pending_parent_is_fused() {
        let mut o = Ontology::new();
        o.add_concept(Concept::new("Kieran", Category::Static).with_parent("Person"))
            .unwrap();
        assert!(o.ancestors("Kieran").is_empty());
        o.add_concept(Concept::new("Person", Category::Abstract).with_property("legs", 2.0))
            .unwrap();
        assert!(o.concept("Person").unwrap().children().contains("Kieran"));
        assert!(o.concept("Kieran").unwrap().property("legs").is_some());
    }

    #[test]
    fn refuses_cycles_duplicates_and_null_properties() {
        let mut o = people();
        assert!(o.add_parent("Person", "Kieran").is_err());
        assert!(o.add_concept(Concept::new("Person", Category::Dynamic)).is_err());
        assert!(matches!(
            o.set_property("Person", "age", Value::Null),
            Err(CognitiveError::InvariantViolation(_))
        ));
    }

    #[test]
    fn relation_views_follow_graph() {
        let mut o = people();
        o.add_relation(Relation::new("speaks").with_group(["Person"], ["Language"]))
            .unwrap();
        assert!(o.relation("speaks").unwrap().between("Kieran", "English"));
        o.add_concept(Concept::new("Ann", Category::Static).with_parent("Person"))
            .unwrap();
        assert!(o.relation("speaks").unwrap().between("Ann", "English"));
        o.remove_parent("Ann", "Person").unwrap();
        assert!(!o.relation("speaks").unwrap().between("Ann", "English"));
        assert_eq!(o.find_relations("Kieran", "English").len(), 1);
        assert_eq!(o.concept("Kieran").unwrap().relation_refs().get("speaks"), Some(&1));
    }

    /// Alvo expande para descendentes só com condição citando `@`
    #[test]
    fn rule_target_view_expands_and_contracts() {
        let mut o = people();
        o.add_relation(Relation::new("speaks").with_group(["Person"], ["Language"]))
            .unwrap();
        let id = o
            .add_rule("speaks", Rule::new(0.6).with_domain("Person").with_target("Language"))
            .unwrap();
        let targets = |o: &Ontology| o.rule("speaks", id).unwrap().targets().derived().clone();
        assert_eq!(targets(&o), names(&["Language"]));
        o.add_condition("speaks", id, Condition::new("@ == English", 1.0).unwrap())
            .unwrap();
        assert_eq!(targets(&o), names(&["English", "Language"]));
        o.remove_condition("speaks", id, 0).unwrap();
        assert_eq!(targets(&o), names(&["Language"]));
    }

    #[test]
    fn rule_members_are_validated() {
        let mut o = people();
        o.add_relation(Relation::new("speaks").with_group(["Person"], ["Language"]))
            .unwrap();
        assert!(matches!(
            o.add_rule("speaks", Rule::new(0.5).with_domain("English").with_target("English")),
            Err(CognitiveError::InvariantViolation(_))
        ));
        assert!(matches!(
            o.add_rule("speaks", Rule::new(0.5).with_domain("Ghost").with_target("English")),
            Err(CognitiveError::UnsupportedOperation(_))
        ));
        let id = o.add_rule("speaks", Rule::new(0.5)).unwrap();
        assert!(matches!(
            o.add_rule_member("speaks", id, Side::Domain, Subject::from("Ghost")),
            Err(CognitiveError::UnsupportedOperation(_))
        ));
        assert!(o
            .add_rule_member("speaks", id, Side::Domain, Subject::from("Kieran"))
            .unwrap());
    }

    #[test]
    fn declared_member_cannot_be_removed() {
        let mut o = people();
        o.add_relation(Relation::new("speaks").with_group(["Person"], ["Language"]))
            .unwrap();
        assert!(matches!(
            o.remove_concept("Person"),
            Err(CognitiveError::InvariantViolation(_))
        ));
        o.remove_concept("Kieran").unwrap();
        assert!(o.descendants("Person").is_empty());
    }

    /// Clone não compartilha estado mutável
    #[test]
    fn clone_is_independent() {
        let original = people();
        let mut copy = original.clone();
        copy.add_alias("Person", "human").unwrap();
        assert!(!original.concept("Kieran").unwrap().aliases().contains("human"));
        assert!(copy.concept("Kieran").unwrap().aliases().contains("human"));
    }

    #[test]
    fn rebuild_restores_derived_state() {
        let mut o = people();
        o.add_relation(Relation::new("speaks").with_group(["Person"], ["Language"]))
            .unwrap();
        let json = serde_json::to_string(&o).unwrap();
        let mut loaded: Ontology = serde_json::from_str(&json).unwrap();
        assert!(!loaded.relation("speaks").unwrap().between("Kieran", "English"));
        loaded.rebuild();
        assert!(loaded.relation("speaks").unwrap().between("Kieran", "English"));
        assert_eq!(loaded.concept("Kieran").unwrap().aliases(), names(&["k", "p"]));
    }
}
