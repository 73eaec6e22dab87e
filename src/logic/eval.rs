//! # Avaliador de Expressões
//!
//! Percorre um [`Node`] contra um [`Scenario`] e devolve um [`Value`].
//! O avaliador não conhece a ontologia diretamente: tudo o que depende do
//! motor (inferência recursiva, candidatos de parâmetros, propriedades,
//! métodos e construtores) passa pelo trait [`Reasoner`].
//!
//! ## Semântica dos operadores
//!
//! | Operador | Resultado |
//! |----------|-----------|
//! | `and` / `or` | Devolve um dos operandos, com curto-circuito (`a and b` = `a` se falso, senão `b`) |
//! | `== !=` | Igualdade frouxa ([`Value::loose_eq`]) |
//! | `is` / `is not` | Identidade ([`Value::identical`]) |
//! | `< > <= >=` | Ordenação; tipos incomparáveis dão `null` |
//! | `+ - * / // % **` | Aritmética em `f64`; tipo incompatível ou divisão por zero dão `null` |
//!
//! Uma relação cujo resultado é *desconhecido* vale `null` nas duas formas
//! (`=` e `-`).

use super::builtins;
use super::node::{Node, Operator, ScenarioKey};
use crate::core::{Inference, Value};
use crate::error::{CognitiveError, Result};
use crate::inference::Scenario;

/// Tudo o que o avaliador precisa do motor de inferência.
pub trait Reasoner {
    /// Inferência recursiva entre dois valores. Valores que não designam
    /// conceito nem instância devolvem `Unknown`.
    fn infer_values(
        &self,
        domain: &Value,
        relation: &str,
        target: &Value,
        evaluate_conditions: bool,
    ) -> Result<Inference>;

    /// Candidatos para um parâmetro livre do cenário.
    fn candidates(&self, key: &ScenarioKey) -> Result<Vec<Value>>;

    /// Propriedade `subject.key`; ausente vale `null`.
    fn property(&self, subject: &Value, key: &str) -> Result<Value>;

    /// Método `subject.method(args)`.
    fn call_method(&self, subject: &Value, method: &str, args: &[Value]) -> Result<Value>;

    /// Construtor `#Concept(args)`.
    fn construct(&self, concept: &str, args: &[Value]) -> Result<Value>;
}

/// Avalia `node` no cenário dado.
///
/// # Erros
///
/// `ScenarioInconsistency` quando uma referência não está vinculada; os
/// demais erros vêm do [`Reasoner`].
pub fn evaluate<R: Reasoner + ?Sized>(node: &Node, scenario: &Scenario, reasoner: &R) -> Result<Value> {
    match node {
        Node::Reference(key) => lookup(scenario, key),
        Node::Relation {
            relation,
            domain,
            target,
            negated,
        } => {
            let d = evaluate(domain, scenario, reasoner)?;
            let t = evaluate(target, scenario, reasoner)?;
            let result = reasoner.infer_values(&d, relation, &t, true)?;
            Ok(relation_value(result, *negated))
        }
        Node::Property { subject, key } => {
            let subject = evaluate(subject, scenario, reasoner)?;
            if subject == Value::Null {
                return Ok(Value::Null);
            }
            reasoner.property(&subject, key)
        }
        Node::Method {
            subject,
            method,
            args,
        } => {
            let subject = evaluate(subject, scenario, reasoner)?;
            let args = evaluate_all(args, scenario, reasoner)?;
            reasoner.call_method(&subject, method, &args)
        }
        Node::Construct { concept, args } => {
            let args = evaluate_all(args, scenario, reasoner)?;
            reasoner.construct(concept, &args)
        }
        Node::Number(n) => Ok(Value::Number(*n)),
        Node::Text(s) => Ok(Value::Text(s.clone())),
        Node::Builtin { function, args } => builtins::call(*function, args, scenario, reasoner),
        Node::Formula {
            args, expression, ..
        } => {
            let values = evaluate_all(args, scenario, reasoner)?;
            let mut bindings = Vec::with_capacity(values.len());
            for (var, value) in expression.variables().into_iter().zip(&values) {
                match numeric(value) {
                    Some(n) => bindings.push((var, n)),
                    None => return Ok(Value::Null),
                }
            }
            Ok(finite(expression.evaluate(&bindings)))
        }
        Node::Binary { op, left, right } => binary(*op, left, right, scenario, reasoner),
        Node::Negate(inner) => {
            let value = evaluate(inner, scenario, reasoner)?;
            Ok(numeric(&value).map(|n| Value::Number(-n)).unwrap_or(Value::Null))
        }
    }
}

pub(crate) fn lookup(scenario: &Scenario, key: &ScenarioKey) -> Result<Value> {
    scenario
        .get(key)
        .cloned()
        .ok_or_else(|| CognitiveError::ScenarioInconsistency(key.to_string()))
}

pub(crate) fn relation_value(result: Inference, negated: bool) -> Value {
    match result {
        Inference::Known(c) if negated => Value::Number(1.0 - c),
        Inference::Known(c) => Value::Number(c),
        Inference::Unknown => Value::Null,
    }
}

fn evaluate_all<R: Reasoner + ?Sized>(nodes: &[Node], scenario: &Scenario, reasoner: &R) -> Result<Vec<Value>> {
    nodes.iter().map(|n| evaluate(n, scenario, reasoner)).collect()
}

/// Números e booleanos entram na aritmética; o resto não.
pub(crate) fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => Some(*n),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn finite(n: f64) -> Value {
    if n.is_finite() {
        Value::Number(n)
    } else {
        Value::Null
    }
}

fn binary<R: Reasoner + ?Sized>(
    op: Operator,
    left: &Node,
    right: &Node,
    scenario: &Scenario,
    reasoner: &R,
) -> Result<Value> {
    let l = evaluate(left, scenario, reasoner)?;
    // `and`/`or` devolvem um operando, não um `Bool`: `is(%, %) and 1` vale `1`
    match op {
        Operator::And if !l.truthy() => return Ok(l),
        Operator::Or if l.truthy() => return Ok(l),
        Operator::And | Operator::Or => return evaluate(right, scenario, reasoner),
        _ => {}
    }
    let r = evaluate(right, scenario, reasoner)?;
    let value = match op {
        Operator::Eq => Value::Bool(l.loose_eq(&r)),
        Operator::Ne => Value::Bool(!l.loose_eq(&r)),
        Operator::Is => Value::Bool(l.identical(&r)),
        Operator::IsNot => Value::Bool(!l.identical(&r)),
        Operator::Gt | Operator::Lt | Operator::Ge | Operator::Le => match l.compare(&r) {
            Some(ordering) => Value::Bool(match op {
                Operator::Gt => ordering.is_gt(),
                Operator::Lt => ordering.is_lt(),
                Operator::Ge => ordering.is_ge(),
                _ => ordering.is_le(),
            }),
            None => Value::Null,
        },
        _ => arithmetic(op, &l, &r),
    };
    Ok(value)
}

fn arithmetic(op: Operator, l: &Value, r: &Value) -> Value {
    match (op, l, r) {
        (Operator::Add, Value::Text(a), Value::Text(b)) => return Value::Text(format!("{}{}", a, b)),
        (Operator::Sub, Value::Date(a), Value::Date(b)) => {
            return Value::Number((*a - *b).num_days() as f64)
        }
        _ => {}
    }
    let (Some(a), Some(b)) = (numeric(l), numeric(r)) else {
        return Value::Null;
    };
    let divides = matches!(op, Operator::Div | Operator::FloorDiv | Operator::Mod);
    if divides && b == 0.0 {
        return Value::Null;
    }
    finite(match op {
        Operator::Add => a + b,
        Operator::Sub => a - b,
        Operator::Mul => a * b,
        Operator::Div => a / b,
        Operator::FloorDiv => (a / b).floor(),
        Operator::Mod => a - b * (a / b).floor(),
        _ => a.powf(b),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::InstanceKey;
    use crate::logic::parse;

    /// Reasoner de teste: `speaks(Kieran, English) = 0.8`, nada mais.
    pub(crate) struct Fixture;

    impl Reasoner for Fixture {
        fn infer_values(&self, d: &Value, relation: &str, t: &Value, evaluate_conditions: bool) -> Result<Inference> {
            if relation != "speaks" {
                return Err(CognitiveError::missing_relation(relation));
            }
            let kieran = Value::Instance(InstanceKey::new("Person", "Kieran"));
            if *d == kieran && t.loose_eq(&Value::from("English")) {
                return Ok(Inference::Known(if evaluate_conditions { 0.8 } else { 0.5 }));
            }
            Ok(Inference::Unknown)
        }

        fn candidates(&self, key: &ScenarioKey) -> Result<Vec<Value>> {
            Ok(match key.concept() {
                Some("Language") => vec![
                    Value::Instance(InstanceKey::new("Language", "English")),
                    Value::Instance(InstanceKey::new("Language", "French")),
                ],
                _ => Vec::new(),
            })
        }

        fn property(&self, subject: &Value, key: &str) -> Result<Value> {
            match (subject.as_instance(), key) {
                (Some(k), "age") if k.name == "Kieran" => Ok(Value::Number(30.0)),
                _ => Ok(Value::Null),
            }
        }

        fn call_method(&self, _subject: &Value, method: &str, _args: &[Value]) -> Result<Value> {
            Err(CognitiveError::UnsupportedOperation(method.to_string()))
        }

        fn construct(&self, concept: &str, _args: &[Value]) -> Result<Value> {
            Ok(Value::Concept(concept.to_string()))
        }
    }

    pub(crate) fn scenario() -> Scenario {
        Scenario::with_subjects(
            Value::Instance(InstanceKey::new("Person", "Kieran")),
            Value::Instance(InstanceKey::new("Language", "English")),
        )
    }

    pub(crate) fn eval(logic: &str) -> Result<Value> {
        evaluate(&parse(logic)?, &scenario(), &Fixture)
    }

    #[test]
    fn relation_and_negated_relation() {
        assert_eq!(eval("%=speaks=@").unwrap(), Value::Number(0.8));
        let negated = eval("%-speaks-@").unwrap().as_number().unwrap();
        assert!((negated - 0.2).abs() < 1e-9);
        assert_eq!(eval("@=speaks=%").unwrap(), Value::Null);
    }

    #[test]
    fn unbound_reference_is_scenario_inconsistency() {
        assert!(matches!(
            eval("#Country.population"),
            Err(CognitiveError::ScenarioInconsistency(_))
        ));
    }

    #[test]
    fn boolean_operators_return_operands() {
        assert_eq!(eval("0 or 'x'").unwrap(), Value::from("x"));
        assert_eq!(eval("0 and 'x'").unwrap(), Value::Number(0.0));
        assert_eq!(eval("%.age > 18 and %.age < 40").unwrap(), Value::Bool(true));
        assert_eq!(eval("is(%, %) and 1").unwrap(), Value::Number(1.0));
    }

    #[test]
    fn arithmetic_rules() {
        assert_eq!(eval("7 // 2").unwrap(), Value::Number(3.0));
        assert_eq!(eval("-7 % 3").unwrap(), Value::Number(2.0));
        assert_eq!(eval("2 ** 10").unwrap(), Value::Number(1024.0));
        assert_eq!(eval("1 / 0").unwrap(), Value::Null);
        assert_eq!(eval("'a' * 2").unwrap(), Value::Null);
        assert_eq!(eval("'a' + 'b'").unwrap(), Value::from("ab"));
    }

    /// Texto compara com nome de instância; `is` exige identidade
    #[test]
    fn equality_versus_identity() {
        assert_eq!(eval("@ == English").unwrap(), Value::Bool(true));
        assert_eq!(eval("@ is English").unwrap(), Value::Bool(false));
        assert_eq!(eval("% is not @").unwrap(), Value::Bool(true));
    }

    #[test]
    fn formula_substitutes_in_order() {
        assert_eq!(eval("f(%.age, 2, \"x / y\")").unwrap(), Value::Number(15.0));
        assert_eq!(eval("f('a', \"x + 1\")").unwrap(), Value::Null);
    }

    #[test]
    fn mixed_operator_expressions() {
        assert_eq!(eval("%.age % 7").unwrap(), Value::Number(2.0));
        assert_eq!(eval("2 ** 3 ** 2").unwrap(), Value::Number(512.0));
        assert_eq!(eval("f(2, 3, x*y + 1)").unwrap(), Value::Number(7.0));
        assert_eq!(eval("(1 + 2) * 3 - 4 // 3").unwrap(), Value::Number(8.0));
        assert_eq!(eval("%.age >= 18 and not_a_keyword == 'not_a_keyword'").unwrap(), Value::Bool(true));
    }

    #[test]
    fn missing_property_is_null() {
        assert_eq!(eval("@.age").unwrap(), Value::Null);
        assert_eq!(eval("@.age.more").unwrap(), Value::Null);
    }
}
