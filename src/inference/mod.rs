//! # Módulo Inference — Motor de Inferência
//!
//! | Sub-módulo | Conteúdo |
//! |------------|----------|
//! | [`engine`] | [`Engine`]: operações públicas e `infer` recursivo |
//! | [`scenario`] | [`Scenario`] e o produto cartesiano de parâmetros |
//! | [`registry`] | [`InstanceRegistry`]: singletons e instâncias dinâmicas |
//! | [`knowledge`] | Ingestão de documentos anotados |
//!
//! ## Exemplo
//!
//! ```rust
//! use cognitive_core::core::{Category, Concept, Relation, Rule};
//! use cognitive_core::inference::Engine;
//!
//! let mut engine = Engine::new();
//! engine.add_concept(Concept::new("Person", Category::Abstract)).unwrap();
//! engine.add_concept(Concept::new("Kieran", Category::Static).with_parent("Person")).unwrap();
//! engine.add_concept(Concept::new("Language", Category::Abstract)).unwrap();
//! engine.add_concept(Concept::new("English", Category::Static).with_parent("Language")).unwrap();
//! engine
//!     .add_relation(Relation::new("speaks").with_group(["Person"], ["Language"]))
//!     .unwrap();
//! engine
//!     .add_rule("speaks", Rule::new(0.8).with_domain("Kieran").with_target("English"))
//!     .unwrap();
//!
//! let kieran = engine.resolve("Kieran").unwrap();
//! let english = engine.resolve("English").unwrap();
//! let result = engine.infer(&kieran, "speaks", &english, true).unwrap();
//! assert!((result.unwrap_or(0.0) - 0.8).abs() < 1e-9);
//! ```

pub mod engine;
pub mod knowledge;
pub mod registry;
pub mod scenario;

pub use engine::{Engine, EngineStats};
pub use knowledge::{Annotation, Classification, Document, Entity, IngestionReport};
pub use registry::InstanceRegistry;
pub use scenario::Scenario;
