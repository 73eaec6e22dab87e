//! # Árvore de Expressão das Condições
//!
//! O [`parser`](super::parser) transforma uma string de condição em um
//! [`Node`]. A árvore é imutável e sem efeitos colaterais; o
//! [`avaliador`](super::eval) a percorre contra um cenário.
//!
//! | Nó | Sintaxe |
//! |----|---------|
//! | `Reference` | `%`, `@`, `#Nome`, `#[tag]Nome` |
//! | `Relation` | `A=rel=B` ou `A-rel-B` (negado: `1 − conf`) |
//! | `Property` | `X.chave` |
//! | `Method` | `X.metodo(args...)` |
//! | `Construct` | `#Nome(args...)` — delega para a fábrica do conceito |
//! | `Number` / `Text` | `10`, `0.5`, `'texto'`, `"texto"` |
//! | `Builtin` / `Formula` | `is(a,b)`, `count(...)`, `f(x, y, "x*y")`... |
//! | `Binary` / `Negate` | `+ - * ** / // % == != > < >= <= and or is` `is not` |

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::algebra::Expr;

/// Chave de cenário: o que um nó de referência procura no cenário.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ScenarioKey {
    /// `%`
    Domain,
    /// `@`
    Target,
    /// `#Nome` (sem tag: só instâncias do próprio conceito) ou
    /// `#[tag]Nome` (parâmetro distinto, inclui descendentes).
    Parameter { concept: String, tag: Option<String> },
}

impl ScenarioKey {
    pub fn parameter(concept: impl Into<String>) -> Self {
        ScenarioKey::Parameter {
            concept: concept.into(),
            tag: None,
        }
    }

    pub fn tagged(concept: impl Into<String>, tag: impl Into<String>) -> Self {
        ScenarioKey::Parameter {
            concept: concept.into(),
            tag: Some(tag.into()),
        }
    }

    /// Parâmetros livres são todos exceto `%` e `@`.
    pub fn is_free(&self) -> bool {
        matches!(self, ScenarioKey::Parameter { .. })
    }

    /// A forma com tag enumera também as instâncias dos descendentes.
    pub fn includes_descendants(&self) -> bool {
        matches!(self, ScenarioKey::Parameter { tag: Some(_), .. })
    }

    pub fn concept(&self) -> Option<&str> {
        match self {
            ScenarioKey::Parameter { concept, .. } => Some(concept),
            _ => None,
        }
    }
}

impl fmt::Display for ScenarioKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioKey::Domain => write!(f, "%"),
            ScenarioKey::Target => write!(f, "@"),
            ScenarioKey::Parameter { concept, tag: None } => write!(f, "#{}", concept),
            ScenarioKey::Parameter {
                concept,
                tag: Some(tag),
            } => write!(f, "#[{}]{}", tag, concept),
        }
    }
}

/// Operadores binários infixos.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Pow,
    Div,
    FloorDiv,
    Mod,
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    And,
    Or,
    Is,
    IsNot,
}

impl Operator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Pow => "**",
            Operator::Div => "/",
            Operator::FloorDiv => "//",
            Operator::Mod => "%",
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Ge => ">=",
            Operator::Le => "<=",
            Operator::And => "and",
            Operator::Or => "or",
            Operator::Is => "is",
            Operator::IsNot => "is not",
        }
    }
}

/// Funções built-in (exceto `f`, que vira [`Node::Formula`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Builtin {
    Facts,
    Is,
    IsNot,
    Eq,
    EqNot,
    Approx,
    Count,
}

impl Builtin {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "facts" => Some(Builtin::Facts),
            "is" => Some(Builtin::Is),
            "isNot" => Some(Builtin::IsNot),
            "eq" => Some(Builtin::Eq),
            "eqNot" => Some(Builtin::EqNot),
            "approx" => Some(Builtin::Approx),
            "count" => Some(Builtin::Count),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Facts => "facts",
            Builtin::Is => "is",
            Builtin::IsNot => "isNot",
            Builtin::Eq => "eq",
            Builtin::EqNot => "eqNot",
            Builtin::Approx => "approx",
            Builtin::Count => "count",
        }
    }
}

/// Nó da árvore de expressão.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Reference(ScenarioKey),
    Relation {
        relation: String,
        domain: Box<Node>,
        target: Box<Node>,
        negated: bool,
    },
    Property {
        subject: Box<Node>,
        key: String,
    },
    Method {
        subject: Box<Node>,
        method: String,
        args: Vec<Node>,
    },
    Construct {
        concept: String,
        args: Vec<Node>,
    },
    Number(f64),
    Text(String),
    Builtin {
        function: Builtin,
        args: Vec<Node>,
    },
    /// `f(x₁, …, xₙ, expr)` com a expressão algébrica já compilada.
    Formula {
        args: Vec<Node>,
        expression: Expr,
        source: String,
    },
    Binary {
        op: Operator,
        left: Box<Node>,
        right: Box<Node>,
    },
    Negate(Box<Node>),
}

impl Node {
    /// Conjunto de chaves de cenário que o nó referencia textualmente.
    ///
    /// `count(alvo, filtros...)` enumera os próprios parâmetros do alvo, então
    /// esses não sobem para a regra.
    pub fn parameters(&self) -> BTreeSet<ScenarioKey> {
        let mut keys = BTreeSet::new();
        self.collect_parameters(&mut keys);
        keys
    }

    /// Parâmetros livres (sem `%` e `@`) — dirigem a enumeração de cenários.
    pub fn free_parameters(&self) -> BTreeSet<ScenarioKey> {
        self.parameters().into_iter().filter(|k| k.is_free()).collect()
    }

    /// Verdadeiro se `@` aparece em qualquer ponto da árvore.
    pub fn references_target(&self) -> bool {
        match self {
            Node::Reference(key) => *key == ScenarioKey::Target,
            _ => self.children().any(|child| child.references_target()),
        }
    }

    /// Parâmetros introduzidos pelo alvo de um `count`.
    pub fn introduced_parameters(&self) -> BTreeSet<ScenarioKey> {
        match self {
            Node::Reference(key) if key.is_free() => [key.clone()].into_iter().collect(),
            Node::Relation { .. } => self.free_parameters(),
            _ => BTreeSet::new(),
        }
    }

    fn collect_parameters(&self, keys: &mut BTreeSet<ScenarioKey>) {
        match self {
            Node::Reference(key) => {
                keys.insert(key.clone());
            }
            Node::Builtin {
                function: Builtin::Count,
                args,
            } => {
                let mut inner = BTreeSet::new();
                for arg in args {
                    arg.collect_parameters(&mut inner);
                }
                let introduced = args
                    .first()
                    .map(|target| target.introduced_parameters())
                    .unwrap_or_default();
                keys.extend(inner.into_iter().filter(|k| !introduced.contains(k)));
            }
            _ => {
                for child in self.children() {
                    child.collect_parameters(keys);
                }
            }
        }
    }

    fn children(&self) -> Box<dyn Iterator<Item = &Node> + '_> {
        match self {
            Node::Reference(_) | Node::Number(_) | Node::Text(_) => Box::new(std::iter::empty()),
            Node::Relation { domain, target, .. } => {
                Box::new([domain.as_ref(), target.as_ref()].into_iter())
            }
            Node::Property { subject, .. } => Box::new(std::iter::once(subject.as_ref())),
            Node::Method { subject, args, .. } => {
                Box::new(std::iter::once(subject.as_ref()).chain(args.iter()))
            }
            Node::Construct { args, .. }
            | Node::Builtin { args, .. }
            | Node::Formula { args, .. } => Box::new(args.iter()),
            Node::Binary { left, right, .. } => {
                Box::new([left.as_ref(), right.as_ref()].into_iter())
            }
            Node::Negate(inner) => Box::new(std::iter::once(inner.as_ref())),
        }
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[Node]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", arg)?;
    }
    Ok(())
}

/// Reconstrói uma forma textual equivalente (parênteses explícitos em operadores).
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Reference(key) => write!(f, "{}", key),
            Node::Relation {
                relation,
                domain,
                target,
                negated,
            } => {
                let sep = if *negated { '-' } else { '=' };
                write!(f, "{}{}{}{}{}", domain, sep, relation, sep, target)
            }
            Node::Property { subject, key } => write!(f, "{}.{}", subject, key),
            Node::Method {
                subject,
                method,
                args,
            } => {
                write!(f, "{}.{}(", subject, method)?;
                write_args(f, args)?;
                write!(f, ")")
            }
            Node::Construct { concept, args } => {
                write!(f, "#{}(", concept)?;
                write_args(f, args)?;
                write!(f, ")")
            }
            Node::Number(n) => write!(f, "{}", n),
            Node::Text(s) => write!(f, "{:?}", s),
            Node::Builtin { function, args } => {
                write!(f, "{}(", function.name())?;
                write_args(f, args)?;
                write!(f, ")")
            }
            Node::Formula { args, source, .. } => {
                write!(f, "f(")?;
                write_args(f, args)?;
                if !args.is_empty() {
                    write!(f, ", ")?;
                }
                write!(f, "{:?})", source)
            }
            Node::Binary { op, left, right } => write!(f, "({} {} {})", left, op.symbol(), right),
            Node::Negate(inner) => write!(f, "-{}", inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(key: ScenarioKey) -> Box<Node> {
        Box::new(Node::Reference(key))
    }

    #[test]
    fn parameters_of_relation() {
        let node = Node::Relation {
            relation: "livesIn".into(),
            domain: reference(ScenarioKey::Domain),
            target: reference(ScenarioKey::parameter("Country")),
            negated: false,
        };
        let params = node.parameters();
        assert!(params.contains(&ScenarioKey::Domain));
        assert_eq!(
            node.free_parameters().into_iter().collect::<Vec<_>>(),
            vec![ScenarioKey::parameter("Country")]
        );
        assert!(!node.references_target());
    }

    /// O alvo de `count` não vira parâmetro livre da regra
    #[test]
    fn count_hides_its_own_parameter() {
        let node = Node::Builtin {
            function: Builtin::Count,
            args: vec![
                Node::Reference(ScenarioKey::tagged("Person", "p")),
                Node::Relation {
                    relation: "knows".into(),
                    domain: reference(ScenarioKey::tagged("Person", "p")),
                    target: reference(ScenarioKey::Target),
                    negated: false,
                },
            ],
        };
        assert!(node.free_parameters().is_empty());
        assert!(node.references_target());
    }

    #[test]
    fn key_display() {
        assert_eq!(ScenarioKey::tagged("Person", "a").to_string(), "#[a]Person");
        assert_eq!(ScenarioKey::Domain.to_string(), "%");
    }
}
