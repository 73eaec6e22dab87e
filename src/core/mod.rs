//! # Módulo Core — Modelo de Conhecimento
//!
//! Os tipos que formam a ontologia e o que a inferência consome:
//!
//! - [`Value`] / [`PropertyValue`] — valores de propriedades e da linguagem de condições
//! - [`Concept`] / [`Category`] — nó tipado com herança de aliases e propriedades
//! - [`Instance`] / [`InstanceKey`] / [`InstanceFactory`] — valores dos tipos
//! - [`Rule`] / [`Condition`] / [`Subject`] — asserção ponderada e suas condições
//! - [`Relation`] / [`ConceptGroup`] — esquema nomeado entre grupos de conceitos
//! - [`Ontology`] — contêiner dono de conceitos e relações
//! - [`Inference`] / [`Evidence`] — resultado de consulta e combinador de evidências
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use cognitive_core::core::{Category, Concept, Ontology, Relation};
//!
//! let mut ontology = Ontology::new();
//! ontology.add_concept(Concept::new("Person", Category::Abstract)).unwrap();
//! ontology.add_concept(Concept::new("Kieran", Category::Static).with_parent("Person")).unwrap();
//! ontology.add_concept(Concept::new("Language", Category::Abstract)).unwrap();
//! ontology
//!     .add_relation(Relation::new("speaks").with_group(["Person"], ["Language"]))
//!     .unwrap();
//! assert!(ontology.relation("speaks").unwrap().between("Kieran", "Language"));
//! ```

pub mod builtin;
pub mod concept;
pub mod confidence;
pub mod instance;
pub mod ontology;
pub mod relation;
pub mod rule;
pub mod value;

pub use concept::{Category, Concept};
pub use confidence::{Evidence, Inference};
pub use instance::{DefaultFactory, FactoryHandle, Instance, InstanceFactory, InstanceKey};
pub use ontology::Ontology;
pub use relation::{ConceptGroup, Relation};
pub use rule::{Condition, MemberSet, Rule, Side, Subject};
pub use value::{Properties, PropertyValue, Value};
