//! Cenários de ponta a ponta pela API pública.

use std::collections::BTreeSet;

use cognitive_core::core::{Category, Concept, Condition, Inference, InstanceKey, Relation, Rule, Subject, Value};
use cognitive_core::inference::{Annotation, Classification, Document, Entity, Scenario};
use cognitive_core::logic::{self, approx, parse, ScenarioKey};
use cognitive_core::{persistence, CognitiveError, Engine};

const EPS: f64 = 1e-9;

fn names(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn confidence(result: Inference) -> f64 {
    result.confidence().expect("known result")
}

/// Pessoas, línguas e países com as regras de `speaks` e `livesIn`.
fn languages() -> Engine {
    let mut e = Engine::new();
    e.add_concept(Concept::new("Person", Category::Abstract)).unwrap();
    e.add_concept(Concept::new("Kieran", Category::Static).with_parent("Person"))
        .unwrap();
    e.add_concept(Concept::new("Language", Category::Abstract)).unwrap();
    e.add_concept(Concept::new("English", Category::Static).with_parent("Language"))
        .unwrap();
    e.add_concept(Concept::new("Country", Category::Dynamic)).unwrap();
    e.create_instance("Country", Some("England"), Default::default())
        .unwrap();
    e.create_instance("Country", Some("Germany"), Default::default())
        .unwrap();
    e.add_relation(
        Relation::new("speaks")
            .with_group(["Person"], ["Language"])
            .with_group(["Country"], ["Language"]),
    )
    .unwrap();
    e.add_relation(Relation::new("livesIn").with_group(["Person"], ["Country"]))
        .unwrap();
    e
}

fn england() -> Subject {
    Subject::Instance(InstanceKey::new("Country", "England"))
}

fn with_speaking_rules(e: &mut Engine) {
    e.add_rule(
        "livesIn",
        Rule::new(0.82).with_domain("Kieran").with_target(england()),
    )
    .unwrap();
    e.add_rule("speaks", Rule::new(1.0).with_domain(england()).with_target("English"))
        .unwrap();
    e.add_rule(
        "speaks",
        Rule::new(0.6)
            .with_domain("Person")
            .with_target("Language")
            .with_condition(Condition::new("%=livesIn=#Country", 1.0).unwrap())
            .with_condition(Condition::new("#Country=speaks=@", 1.0).unwrap()),
    )
    .unwrap();
}

#[test]
fn static_singleton_identity_and_mutation() {
    let mut e = Engine::new();
    e.add_concept(Concept::new("Country", Category::Abstract)).unwrap();
    e.add_concept(
        Concept::new("England", Category::Static)
            .with_parent("Country")
            .with_property("population", 55_000_000.0),
    )
    .unwrap();
    e.add_relation(Relation::new("populous").with_group(["Country"], ["Country"]))
        .unwrap();
    e.add_rule(
        "populous",
        Rule::new(1.0)
            .with_domain("Country")
            .with_target("Country")
            .with_condition(Condition::new("@.population > 60000000", 1.0).unwrap()),
    )
    .unwrap();

    let first = e.instances("England", false).unwrap();
    let second = e.instances("England", false).unwrap();
    assert_eq!(first.len(), 1);
    assert!(std::ptr::eq(first[0], second[0]));

    let england = e.resolve("England").unwrap();
    assert_eq!(confidence(e.infer(&england, "populous", &england, true).unwrap()), 0.0);

    e.instance_mut(&InstanceKey::singleton("England"))
        .unwrap()
        .properties
        .insert("population".into(), Value::Number(70_000_000.0));
    assert_eq!(confidence(e.infer(&england, "populous", &england, true).unwrap()), 1.0);
}

#[test]
fn alias_cascade() {
    let mut e = Engine::new();
    e.add_concept(Concept::new("Person", Category::Abstract).with_alias("p"))
        .unwrap();
    e.add_concept(
        Concept::new("Kieran", Category::Static)
            .with_parent("Person")
            .with_alias("k"),
    )
    .unwrap();
    let aliases = |e: &Engine| e.ontology().concept("Kieran").unwrap().aliases();
    assert_eq!(aliases(&e), names(&["k", "p"]));

    e.update(|o| o.remove_alias("Person", "p")).unwrap();
    assert_eq!(aliases(&e), names(&["k"]));
}

#[test]
fn basic_inference() {
    let mut e = languages();
    e.add_rule("speaks", Rule::new(0.8).with_domain("Kieran").with_target("English"))
        .unwrap();
    let (k, en) = (e.resolve("Kieran").unwrap(), e.resolve("English").unwrap());
    assert!((confidence(e.infer(&k, "speaks", &en, true).unwrap()) - 0.8).abs() < EPS);
}

/// Cadeia `Kieran livesIn England`, `England speaks English`
#[test]
fn condition_over_target() {
    let mut e = languages();
    with_speaking_rules(&mut e);
    let (k, en) = (e.resolve("Kieran").unwrap(), e.resolve("English").unwrap());
    let result = confidence(e.infer(&k, "speaks", &en, true).unwrap());
    assert!(result >= 0.35);
    assert!((result - 0.6 * 0.82).abs() < EPS);

    // Sem condições só sobram regras incondicionais, que não cobrem Kieran
    assert_eq!(e.infer(&k, "speaks", &en, false).unwrap(), Inference::Unknown);
}

#[test]
fn refuting_observation_lowers_confidence() {
    let mut e = languages();
    let kieran = e.resolve("Kieran").unwrap();
    let germany = e.resolve("Country:Germany").unwrap();
    e.add_rule(
        "livesIn",
        Rule::new(0.5).with_domain("Kieran").with_target(germany.clone()),
    )
    .unwrap();
    let prior = confidence(e.infer(&kieran, "livesIn", &germany, true).unwrap());

    let doc = Document {
        text: "Kieran does not live in Germany".into(),
        annotations: vec![Annotation {
            domain: Entity::new("Kieran", "Kieran", 1.0),
            relation: "livesIn".into(),
            target: Entity::new("Country", "Germany", 1.0),
            classification: Classification::Negative,
            confidence: 0.69,
        }],
    };
    e.add_world_knowledge([doc]).unwrap();
    let posterior = confidence(e.infer(&kieran, "livesIn", &germany, true).unwrap());
    assert!(posterior < prior);
    assert!((posterior - 0.5 * 0.31).abs() < EPS);
}

#[test]
fn approx_builtin() {
    assert_eq!(approx(10.0, 10.0, 1.0), 1.0);
    assert!((approx(10.1, 10.0, 1.0) - 0.9).abs() < 1e-6);
    assert_eq!(approx(12.0, 10.0, 1.0), 0.0);
}

#[test]
fn parse_errors() {
    for logic in ["f(", "", "(%.age > 3"] {
        assert!(
            matches!(parse(logic), Err(CognitiveError::MalformedLogic { .. })),
            "{logic:?} should be malformed"
        );
    }
}

#[test]
fn outside_relation_and_identity_are_zero() {
    let mut e = languages();
    e.add_relation(Relation::new("knows").with_group(["Person"], ["Person"]).distinct())
        .unwrap();
    e.add_rule("knows", Rule::new(1.0).with_domain("Person").with_target("Person"))
        .unwrap();
    let (k, en) = (e.resolve("Kieran").unwrap(), e.resolve("English").unwrap());
    assert_eq!(e.infer(&en, "speaks", &k, true).unwrap(), Inference::Known(0.0));
    assert_eq!(e.infer(&k, "knows", &k, true).unwrap(), Inference::Known(0.0));
}

#[test]
fn facts_never_exceed_full_evaluation() {
    let mut e = languages();
    with_speaking_rules(&mut e);
    e.add_rule("speaks", Rule::new(0.3).with_domain("Kieran").with_target("English"))
        .unwrap();
    let scenario = Scenario::with_subjects(
        Value::Instance(InstanceKey::singleton("Kieran")),
        Value::Instance(InstanceKey::singleton("English")),
    );
    e.reset();
    let facts = logic::evaluate(&parse("facts(%=speaks=@)").unwrap(), &scenario, &e)
        .unwrap()
        .as_confidence();
    e.reset();
    let full = logic::evaluate(&parse("%=speaks=@").unwrap(), &scenario, &e)
        .unwrap()
        .as_confidence();
    assert!((facts - 0.3).abs() < EPS);
    assert!(facts <= full);
}

#[test]
fn inference_is_deterministic() {
    let mut e = languages();
    with_speaking_rules(&mut e);
    let (k, en) = (e.resolve("Kieran").unwrap(), e.resolve("English").unwrap());
    let first = e.infer(&k, "speaks", &en, true).unwrap();
    let second = e.infer(&k, "speaks", &en, true).unwrap();
    assert_eq!(first, second);
}

#[test]
fn clone_answers_identically_and_independently() {
    let mut original = languages();
    with_speaking_rules(&mut original);
    let mut copy = original.clone();
    let (k, en) = (original.resolve("Kieran").unwrap(), original.resolve("English").unwrap());
    assert_eq!(
        original.infer(&k, "speaks", &en, true).unwrap(),
        copy.infer(&k, "speaks", &en, true).unwrap()
    );

    copy.add_rule("speaks", Rule::new(0.99).with_domain("Kieran").with_target("English"))
        .unwrap();
    assert!(original.ontology().relation("speaks").unwrap().rules().len() < copy.ontology().relation("speaks").unwrap().rules().len());
    assert!((confidence(original.infer(&k, "speaks", &en, true).unwrap()) - 0.492).abs() < EPS);
}

#[test]
fn persistence_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ontology.json");
    let mut original = languages();
    with_speaking_rules(&mut original);
    persistence::save(&original, &path).unwrap();
    let mut loaded = persistence::load(&path).unwrap().unwrap();

    let (k, en) = (original.resolve("Kieran").unwrap(), original.resolve("English").unwrap());
    assert_eq!(
        original.infer(&k, "speaks", &en, true).unwrap(),
        loaded.infer(&k, "speaks", &en, true).unwrap()
    );
}

#[test]
fn builtin_dates_in_conditions() {
    let mut e = Engine::new();
    e.import_builtin("time").unwrap();
    let day = e
        .create_instance("Date", Some("01-02-2017"), Default::default())
        .unwrap();
    e.add_relation(Relation::new("fallsOn").with_group(["Date"], ["Weekday"]))
        .unwrap();
    e.add_rule(
        "fallsOn",
        Rule::new(1.0)
            .with_domain("Date")
            .with_target("Weekday")
            .with_condition(Condition::new("%.weekday() == @.index", 1.0).unwrap()),
    )
    .unwrap();
    let date = Subject::Instance(day);
    let wednesday = e.resolve("Wednesday").unwrap();
    let thursday = e.resolve("Thursday").unwrap();
    assert_eq!(confidence(e.infer(&date, "fallsOn", &wednesday, true).unwrap()), 1.0);
    assert_eq!(confidence(e.infer(&date, "fallsOn", &thursday, true).unwrap()), 0.0);
}

/// Kieran e Ann estáticos, Bob instância de `Worker`, todos sob `Person`.
fn people() -> Engine {
    let mut e = Engine::new();
    e.add_concept(Concept::new("Person", Category::Abstract)).unwrap();
    for name in ["Kieran", "Ann"] {
        e.add_concept(Concept::new(name, Category::Static).with_parent("Person"))
            .unwrap();
    }
    e.add_concept(Concept::new("Worker", Category::Dynamic).with_parent("Person"))
        .unwrap();
    e.create_instance("Worker", Some("Bob"), Default::default())
        .unwrap();
    e.add_concept(Concept::new("Country", Category::Dynamic)).unwrap();
    e.create_instance("Country", Some("England"), Default::default())
        .unwrap();
    e.add_relation(Relation::new("livesIn").with_group(["Person"], ["Country"]))
        .unwrap();
    e.add_rule(
        "livesIn",
        Rule::new(0.82).with_domain("Kieran").with_target(england()),
    )
    .unwrap();
    e
}

#[test]
fn count_over_the_hierarchy() {
    let e = people();
    let kieran = Value::Instance(InstanceKey::singleton("Kieran"));
    let scenario = Scenario::with_subjects(kieran.clone(), Value::Instance(InstanceKey::new("Country", "England")));
    let count = |logic: &str, scenario: &Scenario| {
        logic::evaluate(&parse(logic).unwrap(), scenario, &e).unwrap()
    };

    assert_eq!(count("count(#[a]Person)", &scenario), Value::Number(3.0));
    assert_eq!(count("count(#Person)", &scenario), Value::Number(0.0));
    assert_eq!(count("count(#Worker)", &scenario), Value::Number(1.0));

    // Parâmetro já vinculado fora do count não é reenumerado
    let bound = scenario.clone().with(ScenarioKey::tagged("Person", "a"), kieran);
    assert_eq!(count("count(#[a]Person)", &bound), Value::Number(1.0));

    // `%` vem do cenário externo
    assert_eq!(count("count(%=livesIn=#Country)", &scenario), Value::Number(1.0));
    let ann = Scenario::with_subjects(
        Value::Instance(InstanceKey::singleton("Ann")),
        Value::Instance(InstanceKey::new("Country", "England")),
    );
    assert_eq!(count("count(%=livesIn=#Country)", &ann), Value::Number(0.0));
}

#[test]
fn count_in_rule_condition_uses_rule_domain() {
    let mut e = people();
    e.add_relation(Relation::new("settled").with_group(["Person"], ["Country"]))
        .unwrap();
    e.add_rule(
        "settled",
        Rule::new(1.0)
            .with_domain("Person")
            .with_target("Country")
            .with_condition(Condition::new("count(%=livesIn=#Country) > 0", 1.0).unwrap()),
    )
    .unwrap();
    let england = e.resolve("Country:England").unwrap();
    let kieran = e.resolve("Kieran").unwrap();
    let ann = e.resolve("Ann").unwrap();
    assert_eq!(confidence(e.infer(&kieran, "settled", &england, true).unwrap()), 1.0);
    assert_eq!(confidence(e.infer(&ann, "settled", &england, true).unwrap()), 0.0);
}
