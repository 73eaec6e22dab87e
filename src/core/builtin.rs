//! # Pacotes Built-in e Fábricas
//!
//! Pacotes de conceitos prontos, instalados por
//! [`Ontology::import_builtin`](super::Ontology::import_builtin):
//!
//! | Pacote | Conceitos |
//! |--------|-----------|
//! | `time` | `Time` (abstrato), `Date` (dinâmico, fábrica `date`), `Weekday` (abstrato), `Monday` … `Sunday` (estáticos, propriedade `index`) |
//! | `email` | `Contact` (abstrato), `Email` (dinâmico, fábrica `email`) |
//!
//! Reimportar um pacote não faz nada.
//!
//! ## Fábricas
//!
//! [`factory`] é a tabela usada para religar fábricas após a
//! desserialização (`default`, `date`, `email`).

use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;

use super::concept::{Category, Concept};
use super::instance::{generic_method, DefaultFactory, FactoryHandle, Instance, InstanceFactory};
use super::ontology::Ontology;
use super::value::{Properties, Value};
use crate::error::{CognitiveError, Result};

pub const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

const DATE_FORMATS: [&str; 3] = ["%d-%m-%Y", "%Y-%m-%d", "%d/%m/%Y"];

/// Fábrica pelo nome estável.
pub fn factory(name: &str) -> Option<FactoryHandle> {
    match name {
        "default" => Some(FactoryHandle::new(DefaultFactory)),
        "date" => Some(FactoryHandle::new(DateFactory)),
        "email" => Some(FactoryHandle::new(EmailFactory)),
        _ => None,
    }
}

fn bundle(name: &str) -> Option<Vec<Concept>> {
    match name {
        "time" => {
            let mut concepts = vec![
                Concept::new("Time", Category::Abstract),
                Concept::new("Date", Category::Dynamic)
                    .with_parent("Time")
                    .with_factory(FactoryHandle::new(DateFactory)),
                Concept::new("Weekday", Category::Abstract)
                    .with_parent("Time")
                    .with_alias("day of the week"),
            ];
            for (index, day) in WEEKDAYS.iter().enumerate() {
                concepts.push(
                    Concept::new(*day, Category::Static)
                        .with_parent("Weekday")
                        .with_alias(&day[..3])
                        .with_property("index", index as f64),
                );
            }
            Some(concepts)
        }
        "email" => Some(vec![
            Concept::new("Contact", Category::Abstract),
            Concept::new("Email", Category::Dynamic)
                .with_parent("Contact")
                .with_alias("e-mail")
                .with_factory(FactoryHandle::new(EmailFactory)),
        ]),
        _ => None,
    }
}

/// Instala os conceitos do pacote que ainda não existem.
pub(crate) fn install(ontology: &mut Ontology, name: &str) -> Result<Vec<String>> {
    let concepts = bundle(name).ok_or_else(|| CognitiveError::MissingReference {
        kind: "bundle",
        name: name.to_string(),
    })?;
    let mut added = Vec::new();
    for concept in concepts {
        if ontology.contains_concept(&concept.name) {
            continue;
        }
        added.push(concept.name.clone());
        ontology.add_concept(concept)?;
    }
    tracing::debug!(bundle = %name, added = added.len(), "Built-in importado");
    Ok(added)
}

// ─── Datas ───

/// Lê uma data em um dos formatos aceitos.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
}

/// Interpreta um valor como data: `Date`, texto ou instância cujo nome é uma data.
pub fn as_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Date(d) => Some(*d),
        Value::Text(s) => parse_date(s),
        Value::Instance(key) => parse_date(&key.name),
        _ => None,
    }
}

/// Propriedades de uma data: `year`, `month`, `day`, `weekday` (segunda = 0).
pub fn date_property(date: NaiveDate, key: &str) -> Value {
    match key {
        "year" => Value::Number(date.year() as f64),
        "month" => Value::Number(date.month() as f64),
        "day" => Value::Number(date.day() as f64),
        "weekday" => Value::Number(date.weekday().num_days_from_monday() as f64),
        _ => Value::Null,
    }
}

/// Métodos de data. Argumento que não é data dá `null`.
pub fn date_method(date: NaiveDate, method: &str, args: &[Value]) -> Result<Value> {
    match (method, args) {
        ("year" | "month" | "day" | "weekday", []) => Ok(date_property(date, method)),
        ("before" | "after" | "daysUntil", [other]) => {
            let Some(other) = as_date(other) else {
                return Ok(Value::Null);
            };
            Ok(match method {
                "before" => Value::Bool(date < other),
                "after" => Value::Bool(date > other),
                _ => Value::Number((other - date).num_days() as f64),
            })
        }
        _ => Err(CognitiveError::UnsupportedOperation(format!(
            "date has no method {}/{}",
            method,
            args.len()
        ))),
    }
}

/// Fábrica de `Date`: o nome da instância é a própria data.
#[derive(Debug, Default)]
pub struct DateFactory;

impl InstanceFactory for DateFactory {
    fn name(&self) -> &str {
        "date"
    }

    fn create(&self, concept: &str, name: &str, mut properties: Properties) -> Result<Instance> {
        let date = parse_date(name).ok_or_else(|| {
            CognitiveError::invariant(format!("'{}' is not a date", name))
        })?;
        properties.insert("date".into(), Value::Date(date));
        Ok(Instance::new(concept, name, properties))
    }

    /// `#Date("01-02-2017")`, `#Date(2017, 2, 1)`; data inválida dá `null`.
    fn call(&self, _concept: &str, args: &[Value]) -> Result<Value> {
        let date = match args {
            [single] => as_date(single),
            [y, m, d] => match (y.as_number(), m.as_number(), d.as_number()) {
                (Some(y), Some(m), Some(d)) => NaiveDate::from_ymd_opt(y as i32, m as u32, d as u32),
                _ => None,
            },
            _ => None,
        };
        Ok(date.map(Value::Date).unwrap_or(Value::Null))
    }

    fn method(&self, instance: &Instance, method: &str, args: &[Value]) -> Result<Value> {
        let date = instance
            .property("date")
            .and_then(as_date)
            .or_else(|| parse_date(instance.name()));
        match date {
            Some(date) => date_method(date, method, args)
                .or_else(|_| generic_method(instance, method, args)),
            None => generic_method(instance, method, args),
        }
    }
}

// ─── E-mails ───

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^([A-Za-z0-9._%+-]+)@([A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,})$").unwrap()
    })
}

/// Fábrica de `Email`: valida o nome e expõe `user` e `domain`.
#[derive(Debug, Default)]
pub struct EmailFactory;

impl InstanceFactory for EmailFactory {
    fn name(&self) -> &str {
        "email"
    }

    fn create(&self, concept: &str, name: &str, mut properties: Properties) -> Result<Instance> {
        let caps = email_regex().captures(name).ok_or_else(|| {
            CognitiveError::invariant(format!("'{}' is not an e-mail address", name))
        })?;
        properties.insert("user".into(), Value::Text(caps[1].to_string()));
        properties.insert("domain".into(), Value::Text(caps[2].to_lowercase()));
        Ok(Instance::new(concept, name, properties))
    }

    fn method(&self, instance: &Instance, method: &str, args: &[Value]) -> Result<Value> {
        match (method, args) {
            ("user" | "domain", []) => Ok(instance.property(method).cloned().unwrap_or(Value::Null)),
            _ => generic_method(instance, method, args),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_formats_and_methods() {
        let d = parse_date("01-02-2017").unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2017, 2, 1).unwrap());
        assert_eq!(parse_date("2017-02-01"), Some(d));
        assert_eq!(date_method(d, "year", &[]).unwrap(), Value::Number(2017.0));
        assert_eq!(
            date_method(d, "before", &[Value::from("02/02/2017")]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            date_method(d, "daysUntil", &[Value::from("2017-02-11")]).unwrap(),
            Value::Number(10.0)
        );
        // 2017-02-01 foi uma quarta-feira
        assert_eq!(date_property(d, "weekday"), Value::Number(2.0));
    }

    #[test]
    fn date_factory_validates_and_constructs() {
        assert!(DateFactory.create("Date", "not a date", Properties::new()).is_err());
        let instance = DateFactory.create("Date", "01-02-2017", Properties::new()).unwrap();
        assert_eq!(
            DateFactory.method(&instance, "month", &[]).unwrap(),
            Value::Number(2.0)
        );
        assert_eq!(
            DateFactory.call("Date", &[Value::from("31-02-2017")]).unwrap(),
            Value::Null
        );
        assert!(matches!(
            DateFactory.call("Date", &[Value::Number(2017.0), Value::Number(2.0), Value::Number(1.0)]).unwrap(),
            Value::Date(_)
        ));
    }

    #[test]
    fn email_factory_splits_address() {
        let instance = EmailFactory
            .create("Email", "kieran@Example.org", Properties::new())
            .unwrap();
        assert_eq!(
            EmailFactory.method(&instance, "domain", &[]).unwrap(),
            Value::from("example.org")
        );
        assert!(EmailFactory.create("Email", "nobody", Properties::new()).is_err());
    }

    /// Importar duas vezes não altera a ontologia
    #[test]
    fn bundles_are_idempotent() {
        let mut o = Ontology::new();
        let first = o.import_builtin("time").unwrap();
        assert_eq!(first.len(), 10);
        assert!(o.import_builtin("time").unwrap().is_empty());
        assert!(o.ancestors("Monday").contains("Time"));
        assert!(matches!(
            o.import_builtin("weather"),
            Err(CognitiveError::MissingReference { .. })
        ));
    }

    #[test]
    fn factory_table() {
        assert_eq!(factory("date").unwrap().name(), "date");
        assert!(factory("unknown").is_none());
    }
}
