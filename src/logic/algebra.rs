//! Expressões algébricas de variáveis de uma letra, usadas por `f(...)`.
//!
//! Gramática: números, variáveis `a`–`z`/`A`–`Z`, `+ - * /`, potência
//! (`^` ou `**`), menos unário e parênteses. As variáveis recebem os
//! argumentos de `f` **na ordem da primeira aparição** na expressão.

use nom::branch::alt;
use nom::bytes::complete::{tag, take_while1};
use nom::character::complete::{char as pchar, multispace0, one_of, satisfy};
use nom::combinator::{all_consuming, cut, map, map_res, not, opt};
use nom::multi::many0;
use nom::sequence::{delimited, pair, preceded, terminated};
use nom::IResult;

/// Expressão algébrica compilada.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Num(f64),
    Var(char),
    Neg(Box<Expr>),
    Bin(char, Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Compila a expressão. O erro é uma descrição legível.
    pub fn parse(source: &str) -> Result<Expr, String> {
        all_consuming(ws(sum))(source)
            .map(|(_, expr)| expr)
            .map_err(|error| match error {
                nom::Err::Error(e) | nom::Err::Failure(e) => match e.input.trim_start().chars().next() {
                    Some(c) => format!("unexpected '{}' in formula", c),
                    None => "formula ended unexpectedly".to_string(),
                },
                nom::Err::Incomplete(_) => "formula ended unexpectedly".to_string(),
            })
    }

    /// Variáveis em ordem de primeira aparição, sem repetição.
    pub fn variables(&self) -> Vec<char> {
        let mut out = Vec::new();
        self.collect(&mut out);
        out
    }

    fn collect(&self, out: &mut Vec<char>) {
        match self {
            Expr::Num(_) => {}
            Expr::Var(v) => {
                if !out.contains(v) {
                    out.push(*v);
                }
            }
            Expr::Neg(inner) => inner.collect(out),
            Expr::Bin(_, l, r) => {
                l.collect(out);
                r.collect(out);
            }
        }
    }

    /// Avalia com as variáveis vinculadas. Variáveis sem valor valem 0.
    pub fn evaluate(&self, bindings: &[(char, f64)]) -> f64 {
        match self {
            Expr::Num(n) => *n,
            Expr::Var(v) => bindings
                .iter()
                .find(|(name, _)| name == v)
                .map(|(_, value)| *value)
                .unwrap_or(0.0),
            Expr::Neg(inner) => -inner.evaluate(bindings),
            Expr::Bin(op, l, r) => {
                let (a, b) = (l.evaluate(bindings), r.evaluate(bindings));
                match op {
                    '+' => a + b,
                    '-' => a - b,
                    '*' => a * b,
                    '/' => a / b,
                    _ => a.powf(b),
                }
            }
        }
    }
}

fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

fn fold(first: Expr, rest: Vec<(char, Expr)>) -> Expr {
    rest.into_iter()
        .fold(first, |left, (op, right)| Expr::Bin(op, Box::new(left), Box::new(right)))
}

fn sum(input: &str) -> IResult<&str, Expr> {
    let (input, first) = product(input)?;
    let (input, rest) = many0(pair(ws(one_of("+-")), cut(product)))(input)?;
    Ok((input, fold(first, rest)))
}

fn product(input: &str) -> IResult<&str, Expr> {
    let (input, first) = unary(input)?;
    let operator = alt((terminated(pchar('*'), not(pchar('*'))), pchar('/')));
    let (input, rest) = many0(pair(ws(operator), cut(unary)))(input)?;
    Ok((input, fold(first, rest)))
}

fn unary(input: &str) -> IResult<&str, Expr> {
    alt((
        map(preceded(ws(pchar('-')), cut(unary)), |inner| Expr::Neg(Box::new(inner))),
        power,
    ))(input)
}

/// `^` e `**` associam à direita.
fn power(input: &str) -> IResult<&str, Expr> {
    let (input, base) = atom(input)?;
    let (input, exponent) = opt(preceded(ws(alt((tag("^"), tag("**")))), cut(unary)))(input)?;
    Ok(match exponent {
        Some(exponent) => (input, Expr::Bin('^', Box::new(base), Box::new(exponent))),
        None => (input, base),
    })
}

fn atom(input: &str) -> IResult<&str, Expr> {
    ws(alt((
        delimited(pchar('('), sum, cut(ws(pchar(')')))),
        map_res(take_while1(|c: char| c.is_ascii_digit() || c == '.'), |literal: &str| {
            literal.parse().map(Expr::Num)
        }),
        map(
            terminated(
                satisfy(|c| c.is_ascii_alphabetic()),
                not(satisfy(|c| c.is_ascii_alphanumeric())),
            ),
            Expr::Var,
        ),
    )))(input)
}
