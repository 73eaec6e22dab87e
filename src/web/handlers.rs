//! # Handlers HTTP — Os Endpoints da Aplicação
//!
//! Cada função pública neste módulo é um handler Axum, mapeado a uma
//! rota em [`super::create_router()`].
//!
//! | Handler | Método | Retorno |
//! |---------|--------|---------|
//! | `index` | GET | HTML completo (Maud) |
//! | `status` | GET | JSON [`EngineStats`] |
//! | `list_concepts` | GET | JSON `[ConceptSummary]` |
//! | `concept_detail` | GET | JSON `ConceptDetail` ou 404 |
//! | `list_relations` | GET | JSON `[RelationSummary]` |
//! | `infer` | POST | JSON `InferResponse` |
//! | `ingest_knowledge` | POST | JSON [`IngestionReport`] |
//! | `extract` | POST | JSON `[Entity]` |
//! | `reset` | POST | JSON `{ "status": "ok" }` |
//!
//! ## Erros
//!
//! | Erro | Status |
//! |------|--------|
//! | `MissingReference` | 404 |
//! | `MalformedLogic` | 400 |
//! | `InvariantViolation`, `UnsupportedOperation`, `ScenarioInconsistency` | 422 |
//! | falha de persistência ou do gazetteer | 500 |

use std::collections::{BTreeMap, BTreeSet};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::state::AppState;
use super::templates;
use crate::core::{Category, Inference, Value};
use crate::error::CognitiveError;
use crate::inference::{Document, EngineStats, Entity, IngestionReport};
use crate::nlu::EntityExtractor;

/// Erro de handler, já com o status HTTP decidido.
#[derive(Debug)]
pub enum ApiError {
    Core(CognitiveError),
    Internal(anyhow::Error),
}

impl From<CognitiveError> for ApiError {
    fn from(e: CognitiveError) -> Self {
        ApiError::Core(e)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Internal(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Core(CognitiveError::MissingReference { .. }) => StatusCode::NOT_FOUND,
            ApiError::Core(CognitiveError::MalformedLogic { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Core(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match &self {
            ApiError::Core(e) => e.to_string(),
            ApiError::Internal(e) => format!("{:#}", e),
        };
        if status.is_server_error() {
            tracing::error!(error = %error, "Falha interna");
        }
        (status, Json(ErrorBody { error })).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// ─── Tipos de resposta ───────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ConceptSummary {
    pub name: String,
    pub category: Category,
    pub parents: BTreeSet<String>,
    pub aliases: BTreeSet<String>,
    pub instances: usize,
}

#[derive(Debug, Serialize)]
pub struct ConceptDetail {
    pub name: String,
    pub category: Category,
    pub parents: BTreeSet<String>,
    pub children: BTreeSet<String>,
    pub aliases: BTreeSet<String>,
    pub properties: BTreeMap<String, Value>,
    pub ancestors: BTreeSet<String>,
    pub descendants: BTreeSet<String>,
    pub relations: BTreeMap<String, usize>,
}

#[derive(Debug, Serialize)]
pub struct RelationSummary {
    pub name: String,
    pub groups: Vec<(BTreeSet<String>, BTreeSet<String>)>,
    pub differ: bool,
    pub rules: usize,
}

#[derive(Debug, Deserialize)]
pub struct InferRequest {
    pub domain: String,
    pub relation: String,
    pub target: String,
    #[serde(default = "default_true")]
    pub evaluate_conditions: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, PartialEq, Serialize)]
pub struct InferResponse {
    /// `null` quando nenhuma regra contribuiu.
    pub confidence: Option<f64>,
    pub known: bool,
}

impl From<Inference> for InferResponse {
    fn from(result: Inference) -> Self {
        Self {
            confidence: result.confidence(),
            known: result.is_known(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub text: String,
}

// ─── Handlers ────────────────────────────────────────────────────

/// GET `/` — Painel com conceitos, relações e instâncias.
pub async fn index(State(state): State<AppState>) -> Html<String> {
    let engine = state.engine.read();
    Html(templates::dashboard(&engine).into_string())
}

/// GET `/status` — Contagens do motor.
pub async fn status(State(state): State<AppState>) -> Json<EngineStats> {
    Json(state.engine.read().stats())
}

/// GET `/concepts` — Resumo de todos os conceitos, em ordem de nome.
pub async fn list_concepts(State(state): State<AppState>) -> Json<Vec<ConceptSummary>> {
    let engine = state.engine.read();
    let ontology = engine.ontology();
    let summaries = ontology
        .concept_names()
        .into_iter()
        .filter_map(|name| ontology.concept(name))
        .map(|c| ConceptSummary {
            name: c.name.clone(),
            category: c.category,
            parents: c.parents().clone(),
            aliases: c.aliases(),
            instances: engine.registry().of_concept(&c.name).count(),
        })
        .collect();
    Json(summaries)
}

/// GET `/concepts/{name}` — Detalhe de um conceito.
pub async fn concept_detail(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<ConceptDetail> {
    let engine = state.engine.read();
    let ontology = engine.ontology();
    let concept = ontology
        .concept(&name)
        .ok_or_else(|| CognitiveError::MissingReference {
            kind: "concept",
            name: name.clone(),
        })?;
    Ok(Json(ConceptDetail {
        name: concept.name.clone(),
        category: concept.category,
        parents: concept.parents().clone(),
        children: concept.children().clone(),
        aliases: concept.aliases(),
        properties: concept.seed_properties(),
        ancestors: ontology.ancestors(&name),
        descendants: ontology.descendants(&name),
        relations: concept.relation_refs().clone(),
    }))
}

/// GET `/relations` — Relações com seus grupos e número de regras.
pub async fn list_relations(State(state): State<AppState>) -> Json<Vec<RelationSummary>> {
    let engine = state.engine.read();
    let ontology = engine.ontology();
    let summaries = ontology
        .relation_names()
        .into_iter()
        .filter_map(|name| ontology.relation(name))
        .map(|r| RelationSummary {
            name: r.name.clone(),
            groups: r
                .groups()
                .map(|(d, t)| (d.bases().clone(), t.bases().clone()))
                .collect(),
            differ: r.differ,
            rules: r.rules().len(),
        })
        .collect();
    Json(summaries)
}

/// POST `/infer` — Confiança de `relation(domain, target)`.
///
/// Os sujeitos passam por `Engine::resolve`: `"Kieran"`,
/// `"Country:England"` ou só `"England"`.
pub async fn infer(
    State(state): State<AppState>,
    Json(request): Json<InferRequest>,
) -> ApiResult<InferResponse> {
    let mut engine = state.engine.write();
    let domain = engine.resolve(&request.domain)?;
    let target = engine.resolve(&request.target)?;
    let result = engine.infer(&domain, &request.relation, &target, request.evaluate_conditions)?;
    tracing::info!(
        domain = %domain,
        relation = %request.relation,
        target = %target,
        result = %result,
        "Consulta respondida"
    );
    Ok(Json(result.into()))
}

/// POST `/knowledge` — Ingere documentos anotados e persiste a ontologia.
pub async fn ingest_knowledge(
    State(state): State<AppState>,
    Json(documents): Json<Vec<Document>>,
) -> ApiResult<IngestionReport> {
    let mut engine = state.engine.write();
    let report = engine.add_world_knowledge(documents)?;
    crate::persistence::save(&engine, &state.ontology_path)?;
    Ok(Json(report))
}

/// POST `/extract` — Entidades conhecidas encontradas no texto.
pub async fn extract(
    State(state): State<AppState>,
    Json(request): Json<ExtractRequest>,
) -> ApiResult<Vec<Entity>> {
    let engine = state.engine.read();
    let extractor = EntityExtractor::new(&engine).map_err(anyhow::Error::from)?;
    Ok(Json(extractor.extract(&request.text)))
}

/// POST `/reset` — Limpa os memos de todas as regras.
pub async fn reset(State(state): State<AppState>) -> Json<serde_json::Value> {
    state.engine.read().reset();
    tracing::info!("Memos limpos pelo usuário");
    Json(serde_json::json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Concept, Relation, Rule};
    use crate::inference::{Annotation, Classification, Engine};

    fn state(dir: &tempfile::TempDir) -> AppState {
        let mut e = Engine::new();
        e.add_concept(Concept::new("Person", Category::Abstract)).unwrap();
        e.add_concept(Concept::new("Kieran", Category::Static).with_parent("Person"))
            .unwrap();
        e.add_concept(Concept::new("Language", Category::Abstract)).unwrap();
        e.add_concept(Concept::new("English", Category::Static).with_parent("Language"))
            .unwrap();
        e.add_relation(Relation::new("speaks").with_group(["Person"], ["Language"]))
            .unwrap();
        e.add_rule("speaks", Rule::new(0.8).with_domain("Kieran").with_target("English"))
            .unwrap();
        AppState::new(e, dir.path().join("ontology.json"))
    }

    fn request(domain: &str, relation: &str, target: &str) -> InferRequest {
        InferRequest {
            domain: domain.into(),
            relation: relation.into(),
            target: target.into(),
            evaluate_conditions: true,
        }
    }

    #[tokio::test]
    async fn infer_resolves_subjects() {
        let dir = tempfile::tempdir().unwrap();
        let Json(response) = infer(State(state(&dir)), Json(request("Kieran", "speaks", "English")))
            .await
            .unwrap();
        assert!(response.known);
        assert!((response.confidence.unwrap() - 0.8).abs() < 1e-9);
    }

    /// Referência desconhecida vira 404
    #[tokio::test]
    async fn unknown_reference_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = infer(State(state(&dir)), Json(request("Kieran", "speaks", "Klingon")))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn knowledge_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let app = state(&dir);
        let doc = Document {
            text: "Kieran does not speak English".into(),
            annotations: vec![Annotation {
                domain: Entity::new("Kieran", "Kieran", 1.0),
                relation: "speaks".into(),
                target: Entity::new("English", "English", 1.0),
                classification: Classification::Negative,
                confidence: 0.5,
            }],
        };
        let Json(report) = ingest_knowledge(State(app.clone()), Json(vec![doc]))
            .await
            .unwrap();
        assert_eq!(report.rules_added, 1);
        assert!(app.ontology_path.exists());
    }

    #[test]
    fn error_status_mapping() {
        let malformed = ApiError::from(CognitiveError::MalformedLogic {
            logic: "(".into(),
            reason: "unbalanced".into(),
        });
        assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
        let invariant = ApiError::from(CognitiveError::InvariantViolation("x".into()));
        assert_eq!(invariant.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
