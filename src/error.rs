//! # Erros do Núcleo Cognitivo
//!
//! Todos os erros que o núcleo pode devolver ao chamador. Nenhum erro é
//! engolido internamente — cada operação falível retorna [`Result`].
//!
//! | Variante | Quando ocorre |
//! |----------|---------------|
//! | `MalformedLogic` | Parser: expressão vazia, parênteses desbalanceados, built-in desconhecido |
//! | `MissingReference` | Nome de conceito/relação/instância não encontrado |
//! | `InvariantViolation` | Instanciar conceito abstrato, segunda instância estática, propriedade nula... |
//! | `ScenarioInconsistency` | Avaliador encontrou uma chave de cenário não vinculada |
//! | `UnsupportedOperation` | Mutação de regra sobre referência nunca resolvida |

use thiserror::Error;

/// Erro do núcleo de inferência.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CognitiveError {
    /// Expressão de condição mal formada (levantado apenas pelo parser).
    #[error("Malformed logic '{logic}': {reason}")]
    MalformedLogic { logic: String, reason: String },

    /// Referência a conceito, relação ou instância inexistente.
    #[error("Missing {kind} reference: {name}")]
    MissingReference { kind: &'static str, name: String },

    /// Operação violaria um invariante do modelo.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Nó do avaliador exige uma chave de cenário que não está vinculada.
    #[error("Scenario inconsistency: key '{0}' is not bound")]
    ScenarioInconsistency(String),

    /// Operação sobre uma referência parcial que nunca foi resolvida.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),
}

impl CognitiveError {
    pub(crate) fn malformed(logic: &str, reason: impl Into<String>) -> Self {
        CognitiveError::MalformedLogic {
            logic: logic.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn missing_concept(name: &str) -> Self {
        CognitiveError::MissingReference {
            kind: "concept",
            name: name.to_string(),
        }
    }

    pub(crate) fn missing_relation(name: &str) -> Self {
        CognitiveError::MissingReference {
            kind: "relation",
            name: name.to_string(),
        }
    }

    pub(crate) fn missing_instance(name: &str) -> Self {
        CognitiveError::MissingReference {
            kind: "instance",
            name: name.to_string(),
        }
    }

    pub(crate) fn invariant(reason: impl Into<String>) -> Self {
        CognitiveError::InvariantViolation(reason.into())
    }
}

/// Alias de resultado usado em todo o núcleo.
pub type Result<T> = std::result::Result<T, CognitiveError>;
