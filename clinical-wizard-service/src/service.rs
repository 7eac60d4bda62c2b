use axum::{
    Router,
    extract::{Path, Query, State},
    http::{HeaderValue, Request, StatusCode},
    middleware::{Next, from_fn},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Instrument, error, info};
use uuid::Uuid;
use wizard_flow::{
    ExecutionStatus, FlowRunner, GraphError, InMemorySessionStorage, PostgresSessionStorage,
    Session, SessionStorage,
};

use crate::{
    config::ServiceConfig,
    error::WizardError,
    models::{NewNote, NoteUpdate, PatientData, SessionResponse, StartWizardRequest, StepRequest},
    notes::{JsonFileNoteStore, NoteQuery, NotesBook},
    questions::QuestionGenerator,
    tasks::{session_keys, types::Screen},
    workflow::{create_flow_runner, create_wizard_session},
};

type ApiResult<T> = Result<Json<T>, ApiError>;
type ApiError = (StatusCode, Json<Value>);

fn bad_request_error(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn not_found_error(message: &str, id: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": message,
            "id": id
        })),
    )
}

fn internal_error(message: &str, details: &str) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": message,
            "details": details
        })),
    )
}

impl From<WizardError> for ApiError {
    fn from(err: WizardError) -> Self {
        match &err {
            WizardError::NoteNotFound(id) => not_found_error("Note not found", id),
            WizardError::DeletionNotConfirmed(id) => (
                StatusCode::CONFLICT,
                Json(json!({
                    "error": err.to_string(),
                    "id": id,
                    "hint": "repeat the request with ?confirm=true"
                })),
            ),
            WizardError::UnknownTest(_)
            | WizardError::InvalidTestTransition { .. }
            | WizardError::MissingResult(_) => bad_request_error(&err.to_string()),
            WizardError::Flow(flow) => flow_error(flow),
            _ => {
                error!(error = %err, "Request failed");
                internal_error("Internal error", &err.to_string())
            }
        }
    }
}

fn flow_error(err: &GraphError) -> ApiError {
    match err {
        GraphError::SessionNotFound(id) => not_found_error("Session not found", id),
        GraphError::ContextError(message) => bad_request_error(message),
        other => {
            error!(error = %other, "Workflow failed");
            internal_error("Workflow execution failed", &other.to_string())
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub session_storage: Arc<dyn SessionStorage>,
    pub flow_runner: FlowRunner,
    pub notes: NotesBook,
}

impl AppState {
    pub fn new(
        session_storage: Arc<dyn SessionStorage>,
        notes: NotesBook,
        generator: QuestionGenerator,
    ) -> Self {
        let flow_runner = create_flow_runner(session_storage.clone(), generator);
        Self {
            session_storage,
            flow_runner,
            notes,
        }
    }
}

pub async fn create_app(config: &ServiceConfig) -> Router {
    let session_storage = create_session_storage(config).await;
    let notes = NotesBook::new(Arc::new(JsonFileNoteStore::new(&config.notes_path)));
    info!(path = %config.notes_path.display(), "Using JSON file note storage");

    let generator = QuestionGenerator::new(config.question_delay());
    build_router(AppState::new(session_storage, notes, generator))
}

async fn create_session_storage(config: &ServiceConfig) -> Arc<dyn SessionStorage> {
    match &config.database_url {
        Some(database_url) => {
            info!("Using PostgreSQL session storage");
            match PostgresSessionStorage::connect(database_url).await {
                Ok(storage) => Arc::new(storage),
                Err(e) => {
                    error!(
                        "Failed to connect to PostgreSQL: {}. Falling back to in-memory storage.",
                        e
                    );
                    Arc::new(InMemorySessionStorage::new())
                }
            }
        }
        None => {
            info!("Using in-memory session storage (set DATABASE_URL to use PostgreSQL)");
            Arc::new(InMemorySessionStorage::new())
        }
    }
}

/// Middleware to add correlation ID to all requests
async fn correlation_id_middleware(mut request: Request<axum::body::Body>, next: Next) -> Response {
    let correlation_id = Uuid::new_v4().to_string();
    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        request.headers_mut().insert("x-correlation-id", value);
    }

    let span = tracing::info_span!("http_request", correlation_id = %correlation_id);
    next.run(request).instrument(span).await
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/wizard", post(start_wizard))
        .route("/wizard/{session_id}", get(get_session_status))
        .route("/wizard/{session_id}/step", post(submit_step))
        .route("/wizard/{session_id}/back", post(go_back))
        .route("/notes", get(list_notes).post(create_note))
        .route(
            "/notes/{note_id}",
            get(get_note).put(update_note).delete(delete_note),
        )
        .layer(from_fn(correlation_id_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "Clinical Workflow Wizard",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Step-by-step clinical workup with keyword-driven questions and differential refinement",
        "steps": ["intake", "history", "examination", "differential_review", "test_ordering", "final_diagnosis"],
        "endpoints": {
            "POST /wizard": "Start a new wizard session",
            "GET /wizard/{session_id}": "Current step, patient record and prompt",
            "POST /wizard/{session_id}/step": "Submit input for the current step",
            "POST /wizard/{session_id}/back": "Return to the previous step",
            "GET /notes": "List notes (patient_id, search, sort, order)",
            "POST /notes": "Create a note",
            "GET /notes/{note_id}": "Fetch a note",
            "PUT /notes/{note_id}": "Update a note",
            "DELETE /notes/{note_id}?confirm=true": "Delete a note",
            "GET /health": "Health check"
        }
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn start_wizard(
    State(state): State<AppState>,
    request: Option<Json<StartWizardRequest>>,
) -> ApiResult<SessionResponse> {
    let patient_id = request.and_then(|Json(r)| r.patient_id);
    let session = create_wizard_session(patient_id).await;
    let session_id = session.id.clone();
    info!(session_id = %session_id, "Starting wizard session");

    save_session(&state, session).await?;
    let result = state
        .flow_runner
        .run(&session_id)
        .await
        .map_err(|e| flow_error(&e))?;

    respond_with_session(&state, &session_id, result.status).await
}

async fn get_session_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<SessionResponse> {
    let session = load_session(&state, &session_id).await?;
    let completed = session
        .context
        .get(session_keys::WORKFLOW_COMPLETED)
        .await
        .unwrap_or(false);
    let status = if completed {
        ExecutionStatus::Completed
    } else {
        ExecutionStatus::WaitingForInput
    };
    Ok(Json(session_response(&state, session, status).await))
}

async fn submit_step(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<StepRequest>,
) -> ApiResult<SessionResponse> {
    let session = load_session(&state, &session_id).await?;

    if session
        .context
        .get::<bool>(session_keys::WORKFLOW_COMPLETED)
        .await
        .unwrap_or(false)
    {
        return Err(bad_request_error("Workflow already completed"));
    }

    info!(
        session_id = %session_id,
        step = %session.current_task_id,
        "Submitting step input"
    );

    session
        .context
        .set(session_keys::STEP_INPUT, request.input)
        .await;
    save_session(&state, session).await?;

    let result = state
        .flow_runner
        .run(&session_id)
        .await
        .map_err(|e| flow_error(&e))?;

    respond_with_session(&state, &session_id, result.status).await
}

async fn go_back(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<SessionResponse> {
    let session = state
        .flow_runner
        .back(&session_id)
        .await
        .map_err(|e| flow_error(&e))?;

    // A finished workflow becomes editable again once the user steps back
    session
        .context
        .set(session_keys::WORKFLOW_COMPLETED, false)
        .await;
    save_session(&state, session.clone()).await?;

    info!(session_id = %session_id, step = %session.current_task_id, "Stepped back");
    Ok(Json(
        session_response(&state, session, ExecutionStatus::WaitingForInput).await,
    ))
}

async fn load_session(state: &AppState, session_id: &str) -> Result<Session, ApiError> {
    match state.session_storage.get(session_id).await {
        Ok(Some(session)) => Ok(session),
        Ok(None) => Err(not_found_error("Session not found", session_id)),
        Err(e) => {
            error!("Failed to load session {}: {}", session_id, e);
            Err(internal_error("Failed to load session", &e.to_string()))
        }
    }
}

async fn save_session(state: &AppState, session: Session) -> Result<(), ApiError> {
    state.session_storage.save(session).await.map_err(|e| {
        error!("Failed to save session: {}", e);
        internal_error("Failed to save session", &e.to_string())
    })
}

async fn respond_with_session(
    state: &AppState,
    session_id: &str,
    status: ExecutionStatus,
) -> ApiResult<SessionResponse> {
    let session = load_session(state, session_id).await?;
    Ok(Json(session_response(state, session, status).await))
}

async fn session_response(
    state: &AppState,
    session: Session,
    status: ExecutionStatus,
) -> SessionResponse {
    let graph = state.flow_runner.graph();
    let patient: Option<PatientData> = session.context.get(session_keys::PATIENT).await;
    let prompt: Option<Screen> = session.context.get(session_keys::LAST_PROMPT).await;
    // A prompt left over from another step is stale
    let prompt = prompt
        .filter(|p| p.step == session.current_task_id)
        .and_then(|p| serde_json::to_value(p).ok());
    let completed = status == ExecutionStatus::Completed;

    SessionResponse {
        session_id: session.id.clone(),
        status: if completed { "completed" } else { "waiting_for_input" }.to_string(),
        step_number: graph.position_of(&session.current_task_id),
        total_steps: graph.task_ids().len(),
        current_step: session.current_task_id,
        status_message: session.status_message,
        prompt,
        patient,
        waiting_for_input: !completed,
    }
}

async fn list_notes(
    State(state): State<AppState>,
    Query(query): Query<NoteQuery>,
) -> ApiResult<Value> {
    let notes = state.notes.list(&query).await?;
    Ok(Json(json!({ "count": notes.len(), "notes": notes })))
}

async fn create_note(
    State(state): State<AppState>,
    Json(request): Json<NewNote>,
) -> Result<Response, ApiError> {
    if request.patient_id.trim().is_empty() || request.title.trim().is_empty() {
        return Err(bad_request_error("patientId and title are required"));
    }
    let note = state.notes.create(request).await?;
    Ok((StatusCode::CREATED, Json(note)).into_response())
}

async fn get_note(
    State(state): State<AppState>,
    Path(note_id): Path<String>,
) -> ApiResult<Value> {
    let note = state.notes.get(&note_id).await?;
    Ok(Json(json!(note)))
}

async fn update_note(
    State(state): State<AppState>,
    Path(note_id): Path<String>,
    Json(update): Json<NoteUpdate>,
) -> ApiResult<Value> {
    let note = state.notes.update(&note_id, update).await?;
    Ok(Json(json!(note)))
}

#[derive(Debug, Default, Deserialize)]
struct DeleteParams {
    #[serde(default)]
    confirm: bool,
}

async fn delete_note(
    State(state): State<AppState>,
    Path(note_id): Path<String>,
    Query(params): Query<DeleteParams>,
) -> Result<StatusCode, ApiError> {
    state.notes.delete(&note_id, params.confirm).await?;
    Ok(StatusCode::NO_CONTENT)
}
