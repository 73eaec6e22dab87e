//! # Templates Maud — HTML Server-Side Rendering
//!
//! Um único painel de leitura: conceitos agrupados por categoria, relações
//! com seus grupos e regras, e as contagens do motor. As operações ficam na
//! API JSON.
//!
//! ```text
//! ┌──────────────── header ─────────────────┐
//! │ Conceitos │ Relações │ Regras │ Inst.   │
//! ├─────────────────────────────────────────┤
//! │ tabela de conceitos                     │
//! │ tabela de relações                      │
//! └─────────────────────────────────────────┘
//! ```

use maud::{html, Markup, DOCTYPE};

use crate::inference::Engine;

const STYLE: &str = "
body { font-family: system-ui, sans-serif; margin: 2rem; color: #1d2330; }
.stats { display: flex; gap: 1.5rem; margin-bottom: 1.5rem; }
.stat-value { font-size: 1.6rem; font-weight: 600; display: block; }
table { border-collapse: collapse; width: 100%; margin-bottom: 2rem; }
th, td { text-align: left; padding: .35rem .6rem; border-bottom: 1px solid #dde1ea; }
.category { font-size: .8rem; padding: .1rem .4rem; border-radius: .3rem; background: #eef1f7; }
.muted { color: #7a8294; }
";

/// Página completa do painel.
pub fn dashboard(engine: &Engine) -> Markup {
    let ontology = engine.ontology();
    let stats = engine.stats();

    html! {
        (DOCTYPE)
        html lang="pt-BR" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { "Cognitive Core" }
                style { (STYLE) }
            }
            body {
                h1 { "Cognitive Core" }
                div class="stats" {
                    (stat(stats.concepts, "Conceitos"))
                    (stat(stats.relations, "Relações"))
                    (stat(stats.rules, "Regras"))
                    (stat(stats.instances, "Instâncias"))
                }

                h2 { "Conceitos" }
                @if stats.concepts == 0 {
                    p class="muted" { "Nenhum conceito ainda." }
                } @else {
                    table {
                        thead { tr { th { "Nome" } th { "Categoria" } th { "Pais" } th { "Aliases" } th { "Instâncias" } } }
                        tbody {
                            @for name in ontology.concept_names() {
                                @if let Some(concept) = ontology.concept(name) {
                                    tr {
                                        td { (concept.name) }
                                        td { span class="category" { (concept.category.label()) } }
                                        td { (join(concept.parents().iter())) }
                                        td class="muted" { (join(concept.aliases().iter())) }
                                        td { (engine.registry().of_concept(name).count()) }
                                    }
                                }
                            }
                        }
                    }
                }

                h2 { "Relações" }
                @if stats.relations == 0 {
                    p class="muted" { "Nenhuma relação ainda." }
                } @else {
                    table {
                        thead { tr { th { "Nome" } th { "Grupos" } th { "Regras" } } }
                        tbody {
                            @for name in ontology.relation_names() {
                                @if let Some(relation) = ontology.relation(name) {
                                    tr {
                                        td {
                                            (relation.name)
                                            @if relation.differ { " " span class="muted" { "(d ≠ t)" } }
                                        }
                                        td {
                                            @for (domains, targets) in relation.groups() {
                                                div {
                                                    (join(domains.bases().iter())) " → " (join(targets.bases().iter()))
                                                }
                                            }
                                        }
                                        td { (relation.rules().len()) }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn stat(value: usize, label: &str) -> Markup {
    html! {
        div class="stat" {
            span class="stat-value" { (value) }
            span class="stat-label" { (label) }
        }
    }
}

fn join<'a>(items: impl Iterator<Item = &'a String>) -> String {
    items.map(String::as_str).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Category, Concept, Relation};

    #[test]
    fn dashboard_lists_concepts_and_relations() {
        let mut engine = Engine::new();
        engine.add_concept(Concept::new("Person", Category::Abstract)).unwrap();
        engine
            .add_relation(Relation::new("knows").with_group(["Person"], ["Person"]).distinct())
            .unwrap();
        let page = dashboard(&engine).into_string();
        assert!(page.contains("Person"));
        assert!(page.contains("knows"));
        assert!(page.contains("abstract"));
    }

    #[test]
    fn empty_engine_renders_placeholders() {
        let page = dashboard(&Engine::new()).into_string();
        assert!(page.contains("Nenhum conceito ainda."));
    }
}
