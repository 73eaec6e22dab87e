//! # Logic — Linguagem de Condições
//!
//! Pequena linguagem de expressões, sem efeitos colaterais, usada pelas
//! condições das regras.
//!
//! ## Pipeline
//!
//! ```text
//! "%=livesIn=#Country"
//!     → parser::parse     → Node (árvore imutável)
//!     → eval::evaluate    → Value (contra um Scenario + Reasoner)
//! ```
//!
//! ## Submódulos
//!
//! - [`node`] — árvore de expressão, chaves de cenário, coleta de parâmetros
//! - [`parser`] — varredura de parênteses e gramática em `nom`
//! - [`eval`] — avaliador e o trait [`Reasoner`]
//! - [`builtins`] — `f`, `facts`, `is`, `isNot`, `eq`, `eqNot`, `approx`, `count`
//! - [`algebra`] — expressões algébricas de `f(...)`

pub mod algebra;
pub mod builtins;
pub mod eval;
pub mod node;
pub mod parser;

pub use builtins::approx;
pub use eval::{evaluate, Reasoner};
pub use node::{Builtin, Node, Operator, ScenarioKey};
pub use parser::parse;
