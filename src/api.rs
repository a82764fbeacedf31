// REST API with Axum
// Routes mirror the course ledger operations one to one.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::LedgerError;
use crate::ledger::Ledger;
use crate::validation::{CoursePatch, NewCourse};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    ledger: Ledger,
}

// ============================================================================
// Error responses
// ============================================================================

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        let status = match &self {
            LedgerError::MissingField(_)
            | LedgerError::InvalidGrade(_)
            | LedgerError::InvalidCredits(_) => StatusCode::BAD_REQUEST,
            LedgerError::NotFound(_) | LedgerError::NoCourses(_) => StatusCode::NOT_FOUND,
            LedgerError::Storage(e) => {
                tracing::error!(error = %format!("{e:#}"), "storage failure");
                return json_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    self.code(),
                    "internal storage error",
                );
            }
        };

        json_error(status, self.code(), self.to_string())
    }
}

fn body_error(rejection: JsonRejection) -> Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_body", rejection.body_text())
}

/// Course ids are integers; anything else cannot name a record
fn parse_course_id(raw: &str) -> Result<i64, Response> {
    raw.parse().map_err(|_| {
        json_error(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("course {} not found", raw),
        )
    })
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "OK" }))
}

/// POST /api/courses - Add a course
async fn add_course(
    State(state): State<AppState>,
    payload: Result<Json<NewCourse>, JsonRejection>,
) -> Response {
    let Json(input) = match payload {
        Ok(body) => body,
        Err(rejection) => return body_error(rejection),
    };

    match state.ledger.create(input) {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /api/courses/:student_id - List a student's courses
async fn list_courses(State(state): State<AppState>, Path(student_id): Path<String>) -> Response {
    match state.ledger.list_by_student(&student_id) {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// PUT /api/courses/:id - Update some fields of a course
async fn update_course(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    payload: Result<Json<CoursePatch>, JsonRejection>,
) -> Response {
    let id = match parse_course_id(&raw_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    // An unknown id is 404 whatever the body holds
    if let Err(e) = state.ledger.get(id) {
        return e.into_response();
    }
    let Json(patch) = match payload {
        Ok(body) => body,
        Err(rejection) => return body_error(rejection),
    };

    match state.ledger.update(id, patch) {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// DELETE /api/courses/:id - Delete a course
async fn delete_course(State(state): State<AppState>, Path(raw_id): Path<String>) -> Response {
    let id = match parse_course_id(&raw_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match state.ledger.delete(id) {
        Ok(()) => (StatusCode::OK, Json(json!({ "message": "Course deleted" }))).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /api/gpa/:student_id - Credit-weighted GPA
async fn get_gpa(State(state): State<AppState>, Path(student_id): Path<String>) -> Response {
    match state.ledger.gpa(&student_id) {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => e.into_response(),
    }
}

// ============================================================================
// Router
// ============================================================================

/// Build the full application router around a ledger
pub fn build_app(ledger: Ledger) -> Router {
    let state = AppState { ledger };

    // GET on /courses/:id lists by student; PUT/DELETE address a course id.
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/courses", post(add_course))
        .route(
            "/courses/:id",
            get(list_courses).put(update_course).delete(delete_course),
        )
        .route("/gpa/:student_id", get(get_gpa))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
