//! # Cognitive Core — Núcleo de Inferência sobre Ontologias
//!
//! Uma ontologia de conceitos e relações, regras ponderadas com condições
//! escritas numa linguagem de expressões embutida, e uma consulta recursiva
//! `infer(d, r, t)` que devolve uma confiança em `[0, 1]` ou "desconhecido".
//!
//! ## Camadas
//!
//! | Módulo | Responsabilidade |
//! |--------|------------------|
//! | [`core`] | Conceitos, instâncias, regras, relações, ontologia |
//! | [`logic`] | Parser e avaliador da linguagem de condições |
//! | [`inference`] | Motor, cenários, registro de instâncias, ingestão |
//! | [`nlu`] | Fonte de entidades (gazetteer) |
//! | [`persistence`] | Salvar/carregar o motor em JSON |
//! | [`web`] | Servidor axum sobre um motor compartilhado |
//! | [`config`] | Configuração por variáveis de ambiente |
//! | [`error`] | [`CognitiveError`] e o alias [`Result`] |
//!
//! ## Exemplo
//!
//! ```rust
//! use cognitive_core::core::{Category, Concept, Condition, Relation, Rule};
//! use cognitive_core::Engine;
//!
//! let mut engine = Engine::new();
//! engine.add_concept(Concept::new("Person", Category::Abstract)).unwrap();
//! engine
//!     .add_concept(Concept::new("Kieran", Category::Static).with_parent("Person").with_property("age", 30.0))
//!     .unwrap();
//! engine
//!     .add_relation(Relation::new("isAdult").with_group(["Person"], ["Person"]))
//!     .unwrap();
//! engine
//!     .add_rule(
//!         "isAdult",
//!         Rule::new(1.0)
//!             .with_domain("Person")
//!             .with_target("Person")
//!             .with_condition(Condition::new("@.age >= 18", 1.0).unwrap()),
//!     )
//!     .unwrap();
//!
//! let kieran = engine.resolve("Kieran").unwrap();
//! let result = engine.infer(&kieran, "isAdult", &kieran, true).unwrap();
//! assert_eq!(result.confidence(), Some(1.0));
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod inference;
pub mod logic;
pub mod nlu;
pub mod persistence;
pub mod web;

pub use error::{CognitiveError, Result};
pub use inference::Engine;
