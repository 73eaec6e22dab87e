//! Funções built-in da linguagem de condições.
//!
//! Cada built-in recebe as **subárvores** dos argumentos, não valores já
//! avaliados, porque `facts` e `count` controlam a própria avaliação.

use super::eval::{evaluate, lookup, numeric, relation_value, Reasoner};
use super::node::{Builtin, Node};
use crate::core::Value;
use crate::error::Result;
use crate::inference::{scenario, Scenario};

pub(crate) fn call<R: Reasoner + ?Sized>(
    function: Builtin,
    args: &[Node],
    scenario: &Scenario,
    reasoner: &R,
) -> Result<Value> {
    match function {
        Builtin::Facts => facts(&args[0], scenario, reasoner),
        Builtin::Is | Builtin::IsNot => {
            let a = evaluate(&args[0], scenario, reasoner)?;
            let b = evaluate(&args[1], scenario, reasoner)?;
            Ok(indicator(a.identical(&b) == (function == Builtin::Is)))
        }
        Builtin::Eq | Builtin::EqNot => {
            let a = evaluate(&args[0], scenario, reasoner)?;
            let b = evaluate(&args[1], scenario, reasoner)?;
            Ok(indicator(a.loose_eq(&b) == (function == Builtin::Eq)))
        }
        Builtin::Approx => {
            let a = evaluate(&args[0], scenario, reasoner)?;
            let b = evaluate(&args[1], scenario, reasoner)?;
            let d = evaluate(&args[2], scenario, reasoner)?;
            match (numeric(&a), numeric(&b), numeric(&d)) {
                (Some(a), Some(b), Some(d)) => Ok(Value::Number(approx(a, b, d))),
                _ => Ok(Value::Null),
            }
        }
        Builtin::Count => count(&args[0], &args[1..], scenario, reasoner),
    }
}

fn indicator(condition: bool) -> Value {
    Value::Number(if condition { 1.0 } else { 0.0 })
}

/// `1 − |a − b| / d` dentro da tolerância, senão 0.
pub fn approx(a: f64, b: f64, d: f64) -> f64 {
    let diff = (a - b).abs();
    if d <= 0.0 {
        return if diff == 0.0 { 1.0 } else { 0.0 };
    }
    if diff <= d {
        1.0 - diff / d
    } else {
        0.0
    }
}

/// `facts(A=rel=B)`: só regras sem condição contribuem.
fn facts<R: Reasoner + ?Sized>(node: &Node, scenario: &Scenario, reasoner: &R) -> Result<Value> {
    let Node::Relation {
        relation,
        domain,
        target,
        negated,
    } = node
    else {
        return Ok(Value::Null);
    };
    let d = evaluate(domain, scenario, reasoner)?;
    let t = evaluate(target, scenario, reasoner)?;
    let result = reasoner.infer_values(&d, relation, &t, false)?;
    Ok(relation_value(result, *negated))
}

/// `count(alvo, filtros...)`.
///
/// Enumera os parâmetros introduzidos pelo alvo que ainda não estão
/// vinculados no cenário externo. Um alvo-relação também precisa ser
/// verdadeiro para a combinação contar.
fn count<R: Reasoner + ?Sized>(
    target: &Node,
    filters: &[Node],
    outer: &Scenario,
    reasoner: &R,
) -> Result<Value> {
    let keys = target.introduced_parameters();
    let combinations = scenario::enumerate(outer, &keys, reasoner)?;
    let mut total = 0usize;
    'combinations: for combination in &combinations {
        match target {
            Node::Relation { .. } => {
                if !evaluate(target, combination, reasoner)?.truthy() {
                    continue;
                }
            }
            Node::Reference(key) => {
                lookup(combination, key)?;
            }
            _ => {}
        }
        for filter in filters {
            if !evaluate(filter, combination, reasoner)?.truthy() {
                continue 'combinations;
            }
        }
        total += 1;
    }
    tracing::trace!(target_node = %target, total, "count");
    Ok(Value::Number(total as f64))
}
