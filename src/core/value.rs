//! # Value — Valores da Linguagem de Condições
//!
//! Um [`Value`] é tudo que pode aparecer como propriedade de um conceito ou
//! instância, e tudo que o avaliador de expressões produz.
//!
//! ## Escala de Verdade
//!
//! A linguagem mistura booleanos (`==`, `is`) com confianças numéricas.
//! O núcleo usa uma única escala, **[0, 1]** (K = 1):
//!
//! | Valor | Confiança |
//! |-------|-----------|
//! | `Bool(true)` / `Bool(false)` | 1.0 / 0.0 |
//! | `Number(n)` | `n` limitado a [0, 1] |
//! | `Null` | 0.0 |
//! | demais | 1.0 se "truthy", senão 0.0 |
//!
//! Literais fora de [0, 1] não são rejeitados — comparações como
//! `%.population > 1000000` precisam deles.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::instance::InstanceKey;

/// Mapa de propriedades de uma instância.
pub type Properties = BTreeMap<String, Value>;

/// Valor dinâmico manipulado pelo avaliador e guardado em propriedades.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Date(NaiveDate),
    /// Referência a um conceito (quando a consulta é feita sobre o tipo, não sobre uma instância).
    Concept(String),
    /// Referência a uma instância registrada no motor.
    Instance(InstanceKey),
    List(Vec<Value>),
}

impl Value {
    /// Semântica de "truthiness": zero, texto vazio, lista vazia e `Null` são falsos.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Text(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Date(_) | Value::Concept(_) | Value::Instance(_) => true,
        }
    }

    /// Converte o valor para a escala de confiança [0, 1] (ver doc do módulo).
    pub fn as_confidence(&self) -> f64 {
        match self {
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Number(n) if n.is_nan() => 0.0,
            Value::Number(n) => n.clamp(0.0, 1.0),
            other => {
                if other.truthy() {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Interpretação numérica, quando houver.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Chave de instância, se o valor for uma referência a instância.
    pub fn as_instance(&self) -> Option<&InstanceKey> {
        match self {
            Value::Instance(key) => Some(key),
            _ => None,
        }
    }

    /// Igualdade "frouxa" usada por `==` e `eq()`.
    ///
    /// Texto comparado com instância compara contra o **nome da instância**;
    /// texto comparado com conceito compara contra o nome do conceito.
    /// Números comparam com texto numérico.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Instance(key), Value::Text(s)) | (Value::Text(s), Value::Instance(key)) => {
                key.name == *s
            }
            (Value::Concept(name), Value::Text(s)) | (Value::Text(s), Value::Concept(name)) => {
                name == s
            }
            (Value::Number(a), Value::Text(_)) | (Value::Text(_), Value::Number(a)) => {
                let text = if let Value::Number(_) = self { other } else { self };
                text.as_number().map(|b| b == *a).unwrap_or(false)
            }
            (Value::Bool(a), Value::Number(b)) | (Value::Number(b), Value::Bool(a)) => {
                (if *a { 1.0 } else { 0.0 }) == *b
            }
            (a, b) => a == b,
        }
    }

    /// Identidade usada por `is` / `is not` e pelos built-ins `is()` / `isNot()`.
    ///
    /// Duas referências são idênticas quando apontam para a mesma instância
    /// (mesmo conceito e mesmo nome) ou para o mesmo conceito. Valores que não
    /// são referências comparam estruturalmente.
    pub fn identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Instance(a), Value::Instance(b)) => a == b,
            (Value::Concept(a), Value::Concept(b)) => a == b,
            (Value::Instance(_), _) | (_, Value::Instance(_)) => false,
            (Value::Concept(_), _) | (_, Value::Concept(_)) => false,
            (a, b) => a == b,
        }
    }

    /// Ordenação parcial para `<`, `>`, `<=`, `>=`.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (a, b) => match (a.as_number(), b.as_number()) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => None,
            },
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{:?}", s),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Concept(name) => write!(f, "#{}", name),
            Value::Instance(key) => write!(f, "{}", key),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Valor efetivo de uma propriedade de **conceito**.
///
/// Quando vários ancestrais contribuem valores *diferentes* para a mesma
/// chave, o filho guarda um multiconjunto (`Multi`). Valor definido
/// localmente sempre é `Single` — ele sombreia os herdados.
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyValue {
    Single(Value),
    Multi(Vec<Value>),
}

impl PropertyValue {
    /// Achata para um único [`Value`] (multiconjuntos viram `Value::List`).
    pub fn to_value(&self) -> Value {
        match self {
            PropertyValue::Single(v) => v.clone(),
            PropertyValue::Multi(values) => Value::List(values.clone()),
        }
    }

    /// Todos os valores contribuídos.
    pub fn values(&self) -> Vec<&Value> {
        match self {
            PropertyValue::Single(v) => vec![v],
            PropertyValue::Multi(values) => values.iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_scale_clamps_numbers() {
        assert_eq!(Value::Number(2.5).as_confidence(), 1.0);
        assert_eq!(Value::Number(-1.0).as_confidence(), 0.0);
        assert_eq!(Value::Number(0.4).as_confidence(), 0.4);
        assert_eq!(Value::Bool(true).as_confidence(), 1.0);
        assert_eq!(Value::Null.as_confidence(), 0.0);
        assert_eq!(Value::Text("x".into()).as_confidence(), 1.0);
    }

    /// Texto compara contra o nome da instância
    #[test]
    fn text_equals_instance_name() {
        let key = InstanceKey::new("Country", "England");
        assert!(Value::Instance(key.clone()).loose_eq(&Value::from("England")));
        assert!(!Value::Instance(key).loose_eq(&Value::from("Country")));
    }

    #[test]
    fn identity_requires_same_reference() {
        let a = Value::Instance(InstanceKey::new("Country", "England"));
        let b = Value::Instance(InstanceKey::new("Country", "England"));
        let c = Value::Instance(InstanceKey::new("Country", "France"));
        assert!(a.identical(&b));
        assert!(!a.identical(&c));
        assert!(!a.identical(&Value::from("England")));
    }

    #[test]
    fn numeric_text_compares_as_number() {
        assert_eq!(
            Value::from("10").compare(&Value::Number(9.0)),
            Some(Ordering::Greater)
        );
        assert!(Value::Number(3.0).loose_eq(&Value::from("3")));
    }
}
