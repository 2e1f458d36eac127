use std::{
    net::SocketAddr,
    sync::{Arc, Mutex, MutexGuard, OnceLock},
};

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
};
use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use quadlab_core::{
    ChallengeValidator, Coefficients, Config, CurveSample, Derivation, Message, Role, Root,
    RootKind, Viewport,
};
use quadlab_tutor::{EMPTY_REPLY_MESSAGE, RequestTracker, TutorClient, UNAVAILABLE_MESSAGE};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

pub mod session;

pub use session::{CoefficientUpdate, Session};

static METRICS: OnceLock<PrometheusHandle> = OnceLock::new();

#[derive(Clone)]
pub struct AppState {
    pub tutor: Arc<TutorClient>,
    pub session: Arc<Mutex<Session>>,
    pub explain_requests: Arc<RequestTracker>,
    pub validator: Arc<ChallengeValidator>,
    pub viewport: Viewport,
    pub metrics: PrometheusHandle,
}

impl AppState {
    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/equation", get(get_equation).post(set_equation))
        .route("/v1/session", get(get_session))
        .route("/v1/graph", get(graph))
        .route("/v1/explain", post(explain))
        .route("/v1/tutor", post(ask_tutor).delete(clear_chat))
        .route("/v1/challenge", post(challenge))
        .route("/healthz", get(health))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SolutionView {
    pub discriminant: f64,
    pub kind: RootKind,
    pub label: String,
    pub x1: String,
    pub x2: String,
    pub root1: Root,
    pub root2: Root,
    pub derivation: Derivation,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EquationResponse {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub equation: String,
    pub solution: SolutionView,
}

impl From<Coefficients> for EquationResponse {
    fn from(coef: Coefficients) -> Self {
        let sol = coef.solve();
        Self {
            a: coef.a(),
            b: coef.b(),
            c: coef.c(),
            equation: coef.equation_label(),
            solution: SolutionView {
                discriminant: sol.discriminant,
                kind: sol.kind,
                label: sol.kind.label().into(),
                x1: sol.root1.to_string(),
                x2: sol.root2.to_string(),
                root1: sol.root1,
                root2: sol.root2,
                derivation: sol.derivation,
            },
        }
    }
}

async fn get_equation(State(state): State<AppState>) -> Json<EquationResponse> {
    counter!("requests_total", 1, "endpoint" => "get_equation");
    let coef = state.session().coefficients;
    Json(coef.into())
}

async fn set_equation(
    State(state): State<AppState>,
    Json(update): Json<CoefficientUpdate>,
) -> Json<EquationResponse> {
    counter!("requests_total", 1, "endpoint" => "set_equation");
    let coef = state.session().update(update);
    Json(coef.into())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionView {
    pub equation: EquationResponse,
    pub explanation: Option<String>,
    pub chat: Vec<Message>,
    pub explaining: bool,
    pub asking: bool,
}

async fn get_session(State(state): State<AppState>) -> Json<SessionView> {
    counter!("requests_total", 1, "endpoint" => "session");
    let s = state.session().clone();
    Json(SessionView {
        equation: s.coefficients.into(),
        explanation: s.explanation,
        chat: s.chat,
        explaining: s.explaining,
        asking: s.asking,
    })
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GraphQuery {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub scale: Option<f64>,
}

async fn graph(
    State(state): State<AppState>,
    Query(query): Query<GraphQuery>,
) -> Result<Json<CurveSample>, (StatusCode, String)> {
    counter!("requests_total", 1, "endpoint" => "graph");
    let viewport = Viewport {
        width: query.width.unwrap_or(state.viewport.width),
        height: query.height.unwrap_or(state.viewport.height),
        scale: query.scale.unwrap_or(state.viewport.scale),
        origin: None,
    };
    let coef = state.session().coefficients;
    quadlab_core::sample(&coef, &viewport)
        .map(Json)
        .map_err(|err| (StatusCode::BAD_REQUEST, err.to_string()))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExplainResponse {
    pub text: String,
    /// Set when a newer explanation was requested while this one was pending.
    pub stale: bool,
}

async fn explain(State(state): State<AppState>) -> Json<ExplainResponse> {
    counter!("requests_total", 1, "endpoint" => "explain");
    let ticket = state.explain_requests.issue();
    let coef = {
        let mut s = state.session();
        s.explaining = true;
        s.coefficients
    };
    let text = match state.tutor.explain(&coef).await {
        Ok(text) => text,
        Err(err) => {
            warn!(error = %err, "explanation failed");
            UNAVAILABLE_MESSAGE.to_string()
        }
    };
    let stale = !state.explain_requests.is_current(ticket);
    if stale {
        info!("discarding stale explanation");
    } else {
        let mut s = state.session();
        s.explanation = Some(text.clone());
        s.explaining = false;
    }
    Json(ExplainResponse { text, stale })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TutorRequest {
    pub question: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TutorResponse {
    pub reply: String,
    pub history: Vec<Message>,
}

async fn ask_tutor(
    State(state): State<AppState>,
    Json(req): Json<TutorRequest>,
) -> Result<Json<TutorResponse>, (StatusCode, String)> {
    counter!("requests_total", 1, "endpoint" => "tutor");
    let question = req.question.trim();
    if question.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "question must not be empty".into()));
    }
    let coef = {
        let mut s = state.session();
        s.push(Role::User, question);
        s.asking = true;
        s.coefficients
    };
    let reply = match state.tutor.ask(question, &coef).await {
        Ok(reply) => reply,
        Err(quadlab_tutor::Error::EmptyResponse) => EMPTY_REPLY_MESSAGE.to_string(),
        Err(err) => {
            warn!(error = %err, "tutor reply failed");
            UNAVAILABLE_MESSAGE.to_string()
        }
    };
    let mut s = state.session();
    s.push(Role::Assistant, reply.clone());
    s.asking = false;
    Ok(Json(TutorResponse {
        reply,
        history: s.chat.clone(),
    }))
}

async fn clear_chat(State(state): State<AppState>) -> StatusCode {
    counter!("requests_total", 1, "endpoint" => "clear_chat");
    state.session().chat.clear();
    StatusCode::NO_CONTENT
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChallengeResponse {
    pub accepted: bool,
    pub hint: Option<String>,
    /// Set when the service could not be reached and the equation was kept.
    pub message: Option<String>,
    pub equation: EquationResponse,
}

async fn challenge(State(state): State<AppState>) -> Json<ChallengeResponse> {
    counter!("requests_total", 1, "endpoint" => "challenge");
    match state.tutor.challenge(&state.validator).await {
        Ok(challenge) => {
            if !challenge.is_accepted() {
                counter!("challenge_fallbacks_total", 1);
            }
            let coef = {
                let mut s = state.session();
                s.load_challenge(&challenge);
                s.coefficients
            };
            Json(ChallengeResponse {
                accepted: challenge.is_accepted(),
                hint: Some(challenge.hint),
                message: None,
                equation: coef.into(),
            })
        }
        Err(err) => {
            warn!(error = %err, "challenge request failed");
            let coef = state.session().coefficients;
            Json(ChallengeResponse {
                accepted: false,
                hint: None,
                message: Some(UNAVAILABLE_MESSAGE.into()),
                equation: coef.into(),
            })
        }
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn metrics_endpoint(State(state): State<AppState>) -> String {
    state.metrics.render()
}

fn metrics_handle() -> PrometheusHandle {
    METRICS
        .get_or_init(|| {
            let builder = PrometheusBuilder::new();
            match builder.install_recorder() {
                Ok(handle) => handle,
                Err(err) => {
                    warn!(error = %err, "metrics recorder unavailable");
                    PrometheusBuilder::new().build_recorder().handle()
                }
            }
        })
        .clone()
}

pub async fn start(
    cfg: Config,
) -> Result<(SocketAddr, JoinHandle<()>), Box<dyn std::error::Error>> {
    let tutor = TutorClient::new(cfg.tutor.clone())?;
    if cfg.tutor.api_key().is_none() {
        warn!(
            "{} is not set; tutoring requests will report the service as unavailable",
            cfg.tutor.api_key_env
        );
    }
    start_with_tutor(cfg, tutor).await
}

/// Serve with an explicitly constructed tutor client.
pub async fn start_with_tutor(
    cfg: Config,
    tutor: TutorClient,
) -> Result<(SocketAddr, JoinHandle<()>), Box<dyn std::error::Error>> {
    let _ = tracing_subscriber::fmt::try_init();
    cfg.viewport.validate()?;
    let limit = cfg.server.coefficient_limit;
    let state = AppState {
        tutor: Arc::new(tutor),
        session: Arc::new(Mutex::new(Session::new(limit))),
        explain_requests: Arc::new(RequestTracker::new()),
        validator: Arc::new(ChallengeValidator::default().with_bound(limit)),
        viewport: cfg.viewport,
        metrics: metrics_handle(),
    };
    let app = router(state);
    let listener = TcpListener::bind(("0.0.0.0", cfg.server.port)).await?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            error!(error = %err, "server stopped");
        }
    });
    info!("listening on {}", addr);
    Ok((addr, handle))
}
