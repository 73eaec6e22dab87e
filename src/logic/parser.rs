//! # Parser da Linguagem de Condições
//!
//! Converte a string de uma condição em um [`Node`]. O processo tem duas
//! etapas:
//!
//! 1. **Varredura de parênteses** — antes de qualquer coisa, os segmentos
//!    entre parênteses de nível superior são conferidos com um contador de
//!    aninhamento (ignorando o conteúdo de strings). Parêntese sem par falha
//!    com `MalformedLogic`.
//! 2. **Combinadores `nom`** sobre a string, do nó mais externo para o mais
//!    interno. Espaços em branco são livres entre tokens. Precedência, da
//!    mais fraca para a mais forte:
//!
//! ```text
//! or
//! and
//! == != > < >= <= is  is not
//! + -
//! * / // %
//! - unário
//! **                  (associa à direita)
//! A=rel=B  A-rel-B    (relação)
//! X.chave  X.m(...)   (propriedade e método)
//! %  @  #Nome  #[tag]Nome  #Nome(...)  builtin(...)  número  string
//! ```
//!
//! ## Degradação
//!
//! Identificadores desconhecidos viram **literais de texto** (`English`
//! equivale a `'English'`). Já um identificador seguido de `(` que não é
//! built-in é erro de sintaxe: a assinatura é desconhecida.
//!
//! Um identificador entre dois `-` (`a-speaks-b`) é sempre lido como a
//! forma negada de relação, nunca como duas subtrações.

use nom::branch::alt;
use nom::bytes::complete::{tag, take_while, take_while1};
use nom::character::complete::{anychar, char as pchar, digit1, multispace0, satisfy};
use nom::combinator::{all_consuming, consumed, cut, map, map_res, not, opt, peek, recognize, value, verify};
use nom::error::{ErrorKind, FromExternalError, ParseError};
use nom::multi::{fold_many0, many0, separated_list1};
use nom::sequence::{delimited, pair, preceded, terminated, tuple};
use nom::IResult;

use super::algebra::Expr;
use super::node::{Builtin, Node, Operator, ScenarioKey};
use crate::error::{CognitiveError, Result};

/// Faz o parse de uma condição.
///
/// # Erros
///
/// `MalformedLogic` para expressão vazia, parênteses desbalanceados,
/// string sem fechamento, token inesperado ou built-in com assinatura
/// desconhecida.
pub fn parse(logic: &str) -> Result<Node> {
    if logic.trim().is_empty() {
        return Err(CognitiveError::malformed(logic, "empty logic"));
    }
    check_parentheses(logic)?;
    all_consuming(ws(expression))(logic)
        .map(|(_, node)| node)
        .map_err(|error| malformed(logic, error))
}

/// Etapa 1: confere o aninhamento de parênteses fora de strings.
fn check_parentheses(logic: &str) -> Result<()> {
    let mut depth: usize = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (offset, c) in logic.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '(' => depth += 1,
            ')' => {
                if depth == 0 {
                    return Err(CognitiveError::malformed(
                        logic,
                        format!("unmatched ')' at offset {}", offset),
                    ));
                }
                depth -= 1;
            }
            _ => {}
        }
    }
    if depth > 0 {
        return Err(CognitiveError::malformed(
            logic,
            format!("{} unclosed '('", depth),
        ));
    }
    Ok(())
}

/// Erro de parse: o resto da entrada e, quando conhecido, o motivo.
#[derive(Debug)]
struct LogicError<'a> {
    input: &'a str,
    reason: Option<String>,
}

impl<'a> ParseError<&'a str> for LogicError<'a> {
    fn from_error_kind(input: &'a str, _kind: ErrorKind) -> Self {
        Self { input, reason: None }
    }

    fn append(_input: &'a str, _kind: ErrorKind, other: Self) -> Self {
        other
    }
}

impl<'a, E: std::fmt::Display> FromExternalError<&'a str, E> for LogicError<'a> {
    fn from_external_error(input: &'a str, _kind: ErrorKind, e: E) -> Self {
        Self {
            input,
            reason: Some(e.to_string()),
        }
    }
}

type PResult<'a, T> = IResult<&'a str, T, LogicError<'a>>;

fn malformed(logic: &str, error: nom::Err<LogicError<'_>>) -> CognitiveError {
    let reason = match error {
        nom::Err::Error(e) | nom::Err::Failure(e) => e.reason.unwrap_or_else(|| {
            let rest = e.input.trim_start();
            match rest.chars().next() {
                Some(c) => format!("unexpected '{}' at offset {}", c, logic.len() - rest.len()),
                None => "expression ended unexpectedly".to_string(),
            }
        }),
        nom::Err::Incomplete(_) => "expression ended unexpectedly".to_string(),
    };
    CognitiveError::malformed(logic, reason)
}

/// Falha sem retrocesso, com motivo legível.
fn reject<'a, T>(input: &'a str, reason: impl Into<String>) -> PResult<'a, T> {
    Err(nom::Err::Failure(LogicError {
        input,
        reason: Some(reason.into()),
    }))
}

fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> PResult<'a, O>
where
    F: FnMut(&'a str) -> PResult<'a, O>,
{
    delimited(multispace0, inner, multispace0)
}

fn symbol<'a>(c: char) -> impl FnMut(&'a str) -> PResult<'a, char> {
    pchar(c)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

const RESERVED: [&str; 4] = ["and", "or", "is", "not"];

fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> PResult<'a, &'a str> {
    terminated(tag(word), not(satisfy(is_word_char)))
}

fn identifier(input: &str) -> PResult<'_, &str> {
    verify(
        recognize(pair(
            satisfy(|c| c.is_alphabetic() || c == '_'),
            take_while(is_word_char),
        )),
        |word: &str| !RESERVED.contains(&word),
    )(input)
}

fn binary(op: Operator, left: Node, right: Node) -> Node {
    Node::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

/// `operando (operador operando)*`, agrupando à esquerda.
fn left_assoc<'a>(
    input: &'a str,
    operand: fn(&'a str) -> PResult<'a, Node>,
    operator: fn(&'a str) -> PResult<'a, Operator>,
) -> PResult<'a, Node> {
    let (input, first) = operand(input)?;
    let (input, rest) = many0(pair(ws(operator), cut(operand)))(input)?;
    let node = rest
        .into_iter()
        .fold(first, |left, (op, right)| binary(op, left, right));
    Ok((input, node))
}

fn expression(input: &str) -> PResult<'_, Node> {
    left_assoc(input, conjunction, or_operator)
}

fn or_operator(input: &str) -> PResult<'_, Operator> {
    value(Operator::Or, keyword("or"))(input)
}

fn conjunction(input: &str) -> PResult<'_, Node> {
    left_assoc(input, comparison, and_operator)
}

fn and_operator(input: &str) -> PResult<'_, Operator> {
    value(Operator::And, keyword("and"))(input)
}

fn comparison(input: &str) -> PResult<'_, Node> {
    left_assoc(input, additive, comparison_operator)
}

fn comparison_operator(input: &str) -> PResult<'_, Operator> {
    alt((
        value(Operator::Eq, tag("==")),
        value(Operator::Ne, tag("!=")),
        value(Operator::Ge, tag(">=")),
        value(Operator::Le, tag("<=")),
        value(Operator::Gt, tag(">")),
        value(Operator::Lt, tag("<")),
        value(
            Operator::IsNot,
            tuple((keyword("is"), multispace0, keyword("not"))),
        ),
        value(Operator::Is, keyword("is")),
    ))(input)
}

fn additive(input: &str) -> PResult<'_, Node> {
    left_assoc(input, term, additive_operator)
}

fn additive_operator(input: &str) -> PResult<'_, Operator> {
    alt((
        value(Operator::Add, symbol('+')),
        value(Operator::Sub, symbol('-')),
    ))(input)
}

fn term(input: &str) -> PResult<'_, Node> {
    left_assoc(input, unary, term_operator)
}

/// `%` em posição de operador é módulo.
fn term_operator(input: &str) -> PResult<'_, Operator> {
    alt((
        value(Operator::FloorDiv, tag("//")),
        value(Operator::Div, symbol('/')),
        value(Operator::Mul, terminated(symbol('*'), not(symbol('*')))),
        value(Operator::Mod, symbol('%')),
    ))(input)
}

fn unary(input: &str) -> PResult<'_, Node> {
    alt((
        map(preceded(ws(symbol('-')), cut(unary)), |inner| {
            Node::Negate(Box::new(inner))
        }),
        power,
    ))(input)
}

fn power(input: &str) -> PResult<'_, Node> {
    let (input, base) = relational(input)?;
    let (input, exponent) = opt(preceded(ws(tag("**")), cut(unary)))(input)?;
    Ok(match exponent {
        Some(exponent) => (input, binary(Operator::Pow, base, exponent)),
        None => (input, base),
    })
}

fn single_eq(input: &str) -> PResult<'_, char> {
    terminated(symbol('='), not(symbol('=')))(input)
}

/// `A=rel=B` ou `A-rel-B`.
fn relational(input: &str) -> PResult<'_, Node> {
    let (input, domain) = postfix(input)?;
    let (input, form) = opt(alt((
        map(
            delimited(ws(single_eq), ws(identifier), ws(single_eq)),
            |relation| (relation, false),
        ),
        map(
            delimited(ws(symbol('-')), ws(identifier), ws(symbol('-'))),
            |relation| (relation, true),
        ),
    )))(input)?;
    let Some((relation, negated)) = form else {
        if ws(single_eq)(input).is_ok() {
            return reject(input, "a relation must be written A=relation=B");
        }
        return Ok((input, domain));
    };
    let (input, target) = cut(postfix)(input)?;
    Ok((
        input,
        Node::Relation {
            relation: relation.to_string(),
            domain: Box::new(domain),
            target: Box::new(target),
            negated,
        },
    ))
}

fn postfix(input: &str) -> PResult<'_, Node> {
    let (mut input, mut node) = primary(input)?;
    while let Ok((rest, _)) = ws(symbol('.'))(input) {
        let Ok((rest, name)) = ws(identifier)(rest) else {
            return reject(rest, "expected a property or method name after '.'");
        };
        let (rest, args) = opt(arguments)(rest)?;
        node = match args {
            Some((args, _)) => Node::Method {
                subject: Box::new(node),
                method: name.to_string(),
                args,
            },
            None => Node::Property {
                subject: Box::new(node),
                key: name.to_string(),
            },
        };
        input = rest;
    }
    Ok((input, node))
}

fn primary(input: &str) -> PResult<'_, Node> {
    ws(alt((
        number,
        text,
        value(Node::Reference(ScenarioKey::Domain), symbol('%')),
        value(Node::Reference(ScenarioKey::Target), symbol('@')),
        hash,
        word,
        delimited(symbol('('), expression, cut(ws(symbol(')')))),
    )))(input)
}

fn number(input: &str) -> PResult<'_, Node> {
    map(
        map_res(
            recognize(pair(digit1, opt(pair(symbol('.'), digit1)))),
            str::parse::<f64>,
        ),
        Node::Number,
    )(input)
}

/// String entre aspas simples ou duplas; `\x` vale `x`.
fn text(input: &str) -> PResult<'_, Node> {
    let (rest, quote) = alt((symbol('\''), symbol('"')))(input)?;
    let (rest, content) = fold_many0(
        alt((
            preceded(symbol('\\'), anychar),
            satisfy(move |c| c != quote && c != '\\'),
        )),
        String::new,
        |mut acc, c| {
            acc.push(c);
            acc
        },
    )(rest)?;
    let Ok((rest, _)) = symbol(quote)(rest) else {
        return reject(rest, "unterminated string literal");
    };
    Ok((rest, Node::Text(content)))
}

fn word_chars(input: &str) -> PResult<'_, &str> {
    take_while1(is_word_char)(input)
}

/// `#Nome`, `#[tag]Nome` ou o construtor `#Nome(...)`.
fn hash(input: &str) -> PResult<'_, Node> {
    let (rest, _) = symbol('#')(input)?;
    let (rest, tag) = match opt(symbol('['))(rest)? {
        (after, Some(_)) => match terminated(word_chars, symbol(']'))(after) {
            Ok((after, t)) => (after, Some(t.to_string())),
            Err(_) => return reject(after, "malformed parameter tag, expected #[tag]Name"),
        },
        (after, None) => (after, None),
    };
    let Ok((rest, name)) = word_chars(rest) else {
        return reject(rest, "expected a concept name after '#'");
    };
    if tag.is_none() && peek(ws(symbol('(')))(rest).is_ok() {
        let (rest, (args, _)) = arguments(rest)?;
        return Ok((
            rest,
            Node::Construct {
                concept: name.to_string(),
                args,
            },
        ));
    }
    Ok((
        rest,
        Node::Reference(ScenarioKey::Parameter {
            concept: name.to_string(),
            tag,
        }),
    ))
}

/// Identificador solto (texto) ou chamada de built-in.
fn word(input: &str) -> PResult<'_, Node> {
    let (rest, name) = alt((keyword("is"), identifier))(input)?;
    if peek(ws(symbol('(')))(rest).is_err() {
        if name == "is" {
            return Err(nom::Err::Error(LogicError::from_error_kind(input, ErrorKind::Tag)));
        }
        return Ok((rest, Node::Text(name.to_string())));
    }
    let (rest, (args, raw)) = arguments(rest)?;
    match call(name, args, &raw) {
        Ok(node) => Ok((rest, node)),
        Err(reason) => reject(input, reason),
    }
}

/// `(` argumentos `)`, com o texto-fonte de cada argumento.
fn arguments(input: &str) -> PResult<'_, (Vec<Node>, Vec<&str>)> {
    let (input, _) = ws(symbol('('))(input)?;
    if let Ok((rest, _)) = ws(symbol(')'))(input) {
        return Ok((rest, (Vec::new(), Vec::new())));
    }
    let (input, items) = separated_list1(ws(symbol(',')), cut(consumed(expression)))(input)?;
    let (input, _) = cut(ws(symbol(')')))(input)?;
    let (raw, args): (Vec<&str>, Vec<Node>) = items
        .into_iter()
        .map(|(source, node)| (source.trim(), node))
        .unzip();
    Ok((input, (args, raw)))
}

fn call(name: &str, args: Vec<Node>, raw: &[&str]) -> std::result::Result<Node, String> {
    if name == "f" {
        return formula(args, raw);
    }
    let function = Builtin::from_name(name).ok_or_else(|| format!("unknown built-in '{}'", name))?;
    let valid = match function {
        Builtin::Is | Builtin::IsNot | Builtin::Eq | Builtin::EqNot => args.len() == 2,
        Builtin::Approx => args.len() == 3,
        Builtin::Facts => args.len() == 1 && matches!(args[0], Node::Relation { .. }),
        Builtin::Count => matches!(
            args.first(),
            Some(Node::Reference(ScenarioKey::Parameter { .. })) | Some(Node::Relation { .. })
        ),
    };
    if !valid {
        return Err(format!(
            "unknown built-in signature {}/{}",
            function.name(),
            args.len()
        ));
    }
    Ok(Node::Builtin { function, args })
}

fn formula(mut args: Vec<Node>, raw: &[&str]) -> std::result::Result<Node, String> {
    let Some(last) = args.pop() else {
        return Err("f() needs an expression argument".to_string());
    };
    let source = match last {
        Node::Text(text) => text,
        _ => raw.last().map(|s| s.to_string()).unwrap_or_default(),
    };
    let expression = Expr::parse(&source)?;
    let variables = expression.variables();
    if variables.len() != args.len() {
        return Err(format!(
            "f() expression binds {} variables but received {} values",
            variables.len(),
            args.len()
        ));
    }
    Ok(Node::Formula {
        args,
        expression,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_malformed(result: Result<Node>) -> bool {
        matches!(result, Err(CognitiveError::MalformedLogic { .. }))
    }

    #[test]
    fn rejects_empty_and_unbalanced() {
        assert!(is_malformed(parse("")));
        assert!(is_malformed(parse("   ")));
        assert!(is_malformed(parse("f(")));
        assert!(is_malformed(parse("(1 + 2))")));
        assert!(is_malformed(parse("'unterminated")));
    }

    /// Parênteses dentro de strings não contam
    #[test]
    fn parentheses_inside_strings_are_ignored() {
        assert_eq!(parse("'(('").unwrap(), Node::Text("((".into()));
    }

    #[test]
    fn relation_forms() {
        let node = parse("%=livesIn=#Country").unwrap();
        match node {
            Node::Relation {
                relation, negated, ..
            } => {
                assert_eq!(relation, "livesIn");
                assert!(!negated);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            parse("#Country-speaks-@").unwrap(),
            Node::Relation { negated: true, .. }
        ));
    }

    #[test]
    fn relation_binds_tighter_than_comparison() {
        let node = parse("%=livesIn=#Country > 0.5 and %.age >= 18").unwrap();
        match node {
            Node::Binary {
                op: Operator::And,
                left,
                ..
            } => assert!(matches!(
                *left,
                Node::Binary {
                    op: Operator::Gt,
                    ..
                }
            )),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn percent_is_modulo_in_operator_position() {
        let node = parse("% .age % 2 == 0").unwrap();
        assert_eq!(node.to_string(), "((%.age % 2) == 0)");
    }

    #[test]
    fn arithmetic_precedence_and_power() {
        assert_eq!(parse("1 + 2 * 3").unwrap().to_string(), "(1 + (2 * 3))");
        assert_eq!(parse("2 ** 3 ** 2").unwrap().to_string(), "(2 ** (3 ** 2))");
        assert_eq!(parse("10 // 3").unwrap().to_string(), "(10 // 3)");
        assert_eq!(parse("-2 ** 2").unwrap().to_string(), "-(2 ** 2)");
    }

    #[test]
    fn is_not_operator_and_is_builtin() {
        assert!(matches!(
            parse("% is not @").unwrap(),
            Node::Binary {
                op: Operator::IsNot,
                ..
            }
        ));
        assert!(matches!(
            parse("is(%, @)").unwrap(),
            Node::Builtin {
                function: Builtin::Is,
                ..
            }
        ));
    }

    #[test]
    fn property_and_method_chains() {
        let node = parse("%.birthday.year()").unwrap();
        assert!(matches!(node, Node::Method { ref method, .. } if method == "year"));
        let node = parse("#[p]Person.age").unwrap();
        assert_eq!(node.to_string(), "#[p]Person.age");
    }

    #[test]
    fn constructor_node() {
        let node = parse("%.birthday < #Date(\"01-02-2017\")").unwrap();
        match node {
            Node::Binary { right, .. } => {
                assert!(matches!(*right, Node::Construct { ref concept, .. } if concept == "Date"))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    /// Identificador desconhecido vira literal de texto
    #[test]
    fn unknown_identifier_degrades_to_text() {
        assert_eq!(parse("English").unwrap(), Node::Text("English".into()));
        assert!(is_malformed(parse("frobnicate(1)")));
    }

    #[test]
    fn builtin_signatures_are_checked() {
        assert!(parse("approx(10.0, 10, 1)").is_ok());
        assert!(is_malformed(parse("approx(1, 2)")));
        assert!(is_malformed(parse("facts(1)")));
        assert!(parse("facts(%=speaks=@)").is_ok());
        assert!(is_malformed(parse("count(1, 2)")));
        assert!(parse("count(#[p]Person, #[p]Person.age > 30)").is_ok());
    }

    #[test]
    fn formula_accepts_string_or_raw_expression() {
        let node = parse("f(2, 3, \"x * y\")").unwrap();
        assert!(matches!(node, Node::Formula { ref source, .. } if source == "x * y"));
        let node = parse("f(%.age, x + 1)").unwrap();
        assert!(matches!(node, Node::Formula { ref source, .. } if source == "x + 1"));
        assert!(is_malformed(parse("f(1, \"x * y\")")));
    }

    #[test]
    fn whitespace_between_tokens_is_free() {
        assert_eq!(
            parse("  %  =  livesIn  =  #Country ").unwrap(),
            parse("%=livesIn=#Country").unwrap()
        );
        assert_eq!(parse("f ( 1 , \"x\" )").unwrap().to_string(), "f(1, \"x\")");
    }

    #[test]
    fn keywords_need_word_boundaries() {
        assert_eq!(parse("android").unwrap(), Node::Text("android".into()));
        assert_eq!(
            parse("% is notable").unwrap().to_string(),
            "(% is \"notable\")"
        );
        assert!(is_malformed(parse("and")));
        assert!(is_malformed(parse("1 2")));
        assert!(is_malformed(parse("1 +")));
    }

    #[test]
    fn error_reasons_are_kept() {
        let reason = |logic: &str| match parse(logic) {
            Err(CognitiveError::MalformedLogic { reason, .. }) => reason,
            other => panic!("expected malformed, got {:?}", other),
        };
        assert!(reason("frobnicate(1)").contains("unknown built-in"));
        assert!(reason("'open").contains("unterminated"));
        assert!(reason("%=livesIn").contains("A=relation=B"));
        assert!(reason("#[x Person").contains("#[tag]Name"));
        assert!(reason("1 $ 2").contains("offset 2"));
    }

    #[test]
    fn escaped_quotes_in_strings() {
        assert_eq!(parse(r"'it\'s'").unwrap(), Node::Text("it's".into()));
        assert_eq!(parse("\"\"").unwrap(), Node::Text(String::new()));
    }

    #[test]
    fn tagged_parameters() {
        let node = parse("#[a]Person=knows=#[b]Person").unwrap();
        let params = node.free_parameters();
        assert!(params.contains(&ScenarioKey::tagged("Person", "a")));
        assert!(params.contains(&ScenarioKey::tagged("Person", "b")));
    }
}
