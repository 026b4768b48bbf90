use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::{Path, Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;

use tally_core::error::ServiceError;
use tally_core::models::{
    Exercise, ExerciseInput, ExerciseSet, List, ListItemInput, NewList, NewPayment, Payment, Stat,
    StatSet, StatSetInput, Transaction, UpdatePayment, Workout,
};
use tally_core::service::TallyService;

const BODY_LIMIT: usize = 1024 * 1024; // 1 MB

#[derive(Clone)]
struct AppState {
    svc: Arc<Mutex<TallyService>>,
    owner: String,
    api_key: Option<String>,
}

impl AppState {
    fn lock(&self) -> std::sync::MutexGuard<'_, TallyService> {
        self.svc
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

// --- Request / Response types ---

#[derive(Deserialize)]
struct UpdateListRequest {
    name: String,
    title: Option<String>,
    #[serde(default)]
    items: Vec<ListItemInput>,
}

#[derive(Deserialize)]
struct CreateWorkoutRequest {
    title: String,
    #[serde(default)]
    exercises: Vec<String>,
}

#[derive(Deserialize)]
struct UpdateWorkoutRequest {
    title: String,
    #[serde(default)]
    exercises: Vec<ExerciseInput>,
    /// Scopes per-exercise set reconciliation to one day (YYYY-MM-DD).
    date: Option<String>,
}

#[derive(Deserialize)]
struct CreateSetRequest {
    rep: String,
    weight: String,
    date: Option<String>,
}

#[derive(Deserialize)]
struct UpdateSetRequest {
    rep: String,
    weight: String,
}

#[derive(Deserialize)]
struct CreateStatRequest {
    title: String,
    unit: Option<String>,
}

#[derive(Deserialize)]
struct UpdateStatRequest {
    title: String,
    unit: Option<String>,
    #[serde(default)]
    sets: Vec<StatSetInput>,
}

#[derive(Deserialize)]
struct StatSetValueRequest {
    value: String,
}

#[derive(Deserialize)]
struct CreateTransactionRequest {
    amount: String,
    completed_date: String,
}

#[derive(Deserialize)]
struct UpdateTransactionRequest {
    amount: Option<String>,
    completed_date: Option<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// --- Error handling ---

enum ApiError {
    NotFound(String),
    BadRequest(String),
    Forbidden(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            Self::Internal(err) => {
                eprintln!("Internal server error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<ServiceError>() {
            Some(ServiceError::NotFound(msg)) => Self::NotFound(msg.clone()),
            Some(ServiceError::Validation(msg)) => Self::BadRequest(msg.clone()),
            Some(ServiceError::Unauthorized(msg)) => Self::Forbidden(msg.clone()),
            None => Self::Internal(err),
        }
    }
}

// --- Middleware ---

async fn require_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(ref expected_key) = state.api_key {
        let authorized = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| token == expected_key);

        if !authorized {
            return (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "Invalid or missing API key".to_string(),
                }),
            )
                .into_response();
        }
    }
    next.run(request).await
}

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

// --- List handlers ---

async fn get_all_lists(State(state): State<AppState>) -> Result<Json<Vec<List>>, ApiError> {
    let lists = state.lock().get_all_lists(&state.owner)?;
    Ok(Json(lists))
}

async fn create_list(
    State(state): State<AppState>,
    Json(req): Json<NewList>,
) -> Result<(StatusCode, Json<List>), ApiError> {
    let list = state.lock().create_list(&state.owner, &req)?;
    Ok((StatusCode::CREATED, Json(list)))
}

async fn get_list(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<List>, ApiError> {
    let list = state.lock().get_list(&state.owner, id)?;
    Ok(Json(list))
}

async fn update_list(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateListRequest>,
) -> Result<Json<List>, ApiError> {
    let list =
        state
            .lock()
            .update_list(&state.owner, id, &req.name, req.title.as_deref(), req.items)?;
    Ok(Json(list))
}

async fn delete_list(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.lock().delete_list(&state.owner, id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn clear_list_items(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let removed = state.lock().delete_items_for_list(&state.owner, id)?;
    Ok(Json(serde_json::json!({ "removed": removed })))
}

async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.lock().delete_item(&state.owner, id)?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Workout handlers ---

async fn get_all_workouts(State(state): State<AppState>) -> Result<Json<Vec<Workout>>, ApiError> {
    let workouts = state.lock().get_all_workouts(&state.owner)?;
    Ok(Json(workouts))
}

async fn create_workout(
    State(state): State<AppState>,
    Json(req): Json<CreateWorkoutRequest>,
) -> Result<(StatusCode, Json<Workout>), ApiError> {
    let workout = state
        .lock()
        .create_workout(&state.owner, &req.title, &req.exercises)?;
    Ok((StatusCode::CREATED, Json(workout)))
}

async fn get_workout(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Workout>, ApiError> {
    let workout = state.lock().get_workout(&state.owner, id)?;
    Ok(Json(workout))
}

async fn get_workouts_by_date(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<Vec<Workout>>, ApiError> {
    let workouts = state.lock().get_workouts_by_date(&state.owner, &date)?;
    Ok(Json(workouts))
}

async fn update_workout(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateWorkoutRequest>,
) -> Result<Json<Workout>, ApiError> {
    let workout = state.lock().update_workout(
        &state.owner,
        id,
        &req.title,
        req.exercises,
        req.date.as_deref(),
    )?;
    Ok(Json(workout))
}

async fn delete_workout(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.lock().delete_workout(&state.owner, id)?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Exercise / set handlers ---

async fn get_exercise(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Exercise>, ApiError> {
    let exercise = state.lock().get_exercise(&state.owner, id)?;
    Ok(Json(exercise))
}

async fn create_set(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<CreateSetRequest>,
) -> Result<(StatusCode, Json<ExerciseSet>), ApiError> {
    let set = state.lock().add_set_to_exercise(
        &state.owner,
        id,
        &req.rep,
        &req.weight,
        req.date.as_deref(),
    )?;
    Ok((StatusCode::CREATED, Json(set)))
}

async fn update_set(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateSetRequest>,
) -> Result<Json<ExerciseSet>, ApiError> {
    let set = state.lock().update_set(&state.owner, id, &req.rep, &req.weight)?;
    Ok(Json(set))
}

async fn delete_set(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.lock().delete_set(&state.owner, id)?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Stat handlers ---

async fn get_all_stats(State(state): State<AppState>) -> Result<Json<Vec<Stat>>, ApiError> {
    let stats = state.lock().get_all_stats(&state.owner)?;
    Ok(Json(stats))
}

async fn create_stat(
    State(state): State<AppState>,
    Json(req): Json<CreateStatRequest>,
) -> Result<(StatusCode, Json<Stat>), ApiError> {
    let stat = state
        .lock()
        .create_stat(&state.owner, &req.title, req.unit.as_deref())?;
    Ok((StatusCode::CREATED, Json(stat)))
}

async fn get_stat(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Stat>, ApiError> {
    let stat = state.lock().get_stat(&state.owner, id)?;
    Ok(Json(stat))
}

async fn update_stat(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateStatRequest>,
) -> Result<Json<Stat>, ApiError> {
    let stat = state.lock().update_stat(
        &state.owner,
        id,
        &req.title,
        req.unit.as_deref(),
        req.sets,
    )?;
    Ok(Json(stat))
}

async fn delete_stat(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.lock().delete_stat(&state.owner, id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_stat_set(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<StatSetValueRequest>,
) -> Result<(StatusCode, Json<StatSet>), ApiError> {
    let set = state.lock().add_stat_set(&state.owner, id, &req.value)?;
    Ok((StatusCode::CREATED, Json(set)))
}

async fn update_stat_set(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<StatSetValueRequest>,
) -> Result<Json<StatSet>, ApiError> {
    let set = state.lock().update_stat_set(&state.owner, id, &req.value)?;
    Ok(Json(set))
}

async fn delete_stat_set(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.lock().delete_stat_set(&state.owner, id)?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Payment handlers ---

async fn get_all_payments(State(state): State<AppState>) -> Result<Json<Vec<Payment>>, ApiError> {
    let payments = state.lock().get_all_payments(&state.owner)?;
    Ok(Json(payments))
}

async fn create_payment(
    State(state): State<AppState>,
    Json(req): Json<NewPayment>,
) -> Result<(StatusCode, Json<Payment>), ApiError> {
    let payment = state.lock().create_payment(&state.owner, &req)?;
    Ok((StatusCode::CREATED, Json(payment)))
}

async fn get_payment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Payment>, ApiError> {
    let payment = state.lock().get_payment(&state.owner, id)?;
    Ok(Json(payment))
}

async fn get_payments_by_month(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<Vec<Payment>>, ApiError> {
    let payments = state.lock().get_payments_by_month(&state.owner, &date)?;
    Ok(Json(payments))
}

async fn update_payment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdatePayment>,
) -> Result<Json<Payment>, ApiError> {
    let payment = state.lock().update_payment(&state.owner, id, &req)?;
    Ok(Json(payment))
}

async fn delete_payment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.lock().delete_payment(&state.owner, id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_transaction(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<CreateTransactionRequest>,
) -> Result<(StatusCode, Json<Transaction>), ApiError> {
    let transaction =
        state
            .lock()
            .add_transaction_to_payment(&state.owner, id, &req.amount, &req.completed_date)?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

async fn update_transaction(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateTransactionRequest>,
) -> Result<Json<Transaction>, ApiError> {
    let transaction = state.lock().update_transaction(
        &state.owner,
        id,
        req.amount.as_deref(),
        req.completed_date.as_deref(),
    )?;
    Ok(Json(transaction))
}

async fn delete_transaction(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.lock().delete_transaction(&state.owner, id)?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Router ---

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/lists", get(get_all_lists).post(create_list))
        .route(
            "/api/lists/{id}",
            get(get_list).put(update_list).delete(delete_list),
        )
        .route("/api/lists/{id}/items", delete(clear_list_items))
        .route("/api/items/{id}", delete(delete_item))
        .route("/api/workouts", get(get_all_workouts).post(create_workout))
        .route(
            "/api/workouts/{id}",
            get(get_workout).put(update_workout).delete(delete_workout),
        )
        .route("/api/workouts/by-date/{date}", get(get_workouts_by_date))
        .route("/api/exercises/{id}", get(get_exercise))
        .route("/api/exercises/{id}/sets", post(create_set))
        .route("/api/sets/{id}", put(update_set).delete(delete_set))
        .route("/api/stats", get(get_all_stats).post(create_stat))
        .route(
            "/api/stats/{id}",
            get(get_stat).put(update_stat).delete(delete_stat),
        )
        .route("/api/stats/{id}/sets", post(create_stat_set))
        .route(
            "/api/stat-sets/{id}",
            put(update_stat_set).delete(delete_stat_set),
        )
        .route("/api/payments", get(get_all_payments).post(create_payment))
        .route(
            "/api/payments/{id}",
            get(get_payment).put(update_payment).delete(delete_payment),
        )
        .route("/api/payments/by-month/{date}", get(get_payments_by_month))
        .route("/api/payments/{id}/transactions", post(create_transaction))
        .route(
            "/api/transactions/{id}",
            put(update_transaction).delete(delete_transaction),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .with_state(state)
}

// --- Server startup ---

pub async fn start_server(
    svc: TallyService,
    owner: String,
    port: u16,
    bind: &str,
    api_key: Option<String>,
) -> anyhow::Result<()> {
    let state = AppState {
        svc: Arc::new(Mutex::new(svc)),
        owner,
        api_key: api_key.clone(),
    };

    let app = build_router(state);

    if let Some(ref key) = api_key {
        eprintln!(
            "API key: {}...{} (see api_key file in data directory)",
            &key[..4],
            &key[key.len() - 4..],
        );
    } else {
        eprintln!("Warning: Authentication disabled (--no-auth). API is open to anyone.");
    }

    if bind != "127.0.0.1" && bind != "localhost" && api_key.is_none() {
        eprintln!(
            "Warning: Listening on {bind} with no authentication. Any device on your network can access this API."
        );
    }

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}")).await?;
    eprintln!("Listening on http://{bind}:{port}");
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_app(api_key: Option<String>) -> Router {
        build_router(AppState {
            svc: Arc::new(Mutex::new(TallyService::new_in_memory().unwrap())),
            owner: "local".to_string(),
            api_key,
        })
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> axum::http::Request<Body> {
        axum::http::Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn put_json(uri: &str, body: serde_json::Value) -> axum::http::Request<Body> {
        axum::http::Request::put(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn auth_missing_key_returns_401() {
        let app = test_app(Some("test-key-abc123".to_string()));

        let response = app
            .oneshot(
                axum::http::Request::get("/api/lists")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(response).await;
        assert_eq!(json["error"], "Invalid or missing API key");
    }

    #[tokio::test]
    async fn auth_wrong_key_returns_401() {
        let app = test_app(Some("test-key-abc123".to_string()));

        let response = app
            .oneshot(
                axum::http::Request::get("/api/lists")
                    .header("Authorization", "Bearer wrong-key")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn auth_correct_key_succeeds() {
        let app = test_app(Some("test-key-abc123".to_string()));

        let response = app
            .oneshot(
                axum::http::Request::get("/api/lists")
                    .header("Authorization", "Bearer test-key-abc123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn no_auth_mode_allows_requests() {
        let app = test_app(None);

        let response = app
            .oneshot(
                axum::http::Request::get("/api/lists")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn security_headers_present() {
        let app = test_app(None);

        let response = app
            .oneshot(
                axum::http::Request::get("/api/lists")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers().get("x-content-type-options").unwrap(),
            "nosniff"
        );
        assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
        assert_eq!(
            response.headers().get("content-security-policy").unwrap(),
            "default-src 'none'"
        );
    }

    #[tokio::test]
    async fn list_create_and_reconcile_roundtrip() {
        let app = test_app(None);

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/lists",
                serde_json::json!({
                    "name": "Groceries",
                    "items": [{ "name": "Milk" }, { "name": "Eggs" }]
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        let id = created["id"].as_i64().unwrap();
        let milk_id = created["items"][0]["id"].as_i64().unwrap();

        // Keep milk checked, drop eggs, add bread.
        let response = app
            .clone()
            .oneshot(put_json(
                &format!("/api/lists/{id}"),
                serde_json::json!({
                    "name": "Groceries",
                    "items": [
                        { "id": milk_id, "name": "Milk", "checked": true },
                        { "name": "Bread", "checked": false }
                    ]
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let updated = body_json(response).await;
        assert_eq!(updated["status"], "updated");
        assert_eq!(updated["items"].as_array().unwrap().len(), 2);

        let response = app
            .oneshot(
                axum::http::Request::delete(format!("/api/items/{milk_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn workout_update_reconciles_sets() {
        let app = test_app(None);

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/workouts",
                serde_json::json!({ "title": "Leg Day", "exercises": ["Squat"] }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        let workout_id = created["id"].as_i64().unwrap();
        let exercise_id = created["exercises"][0]["id"].as_i64().unwrap();

        let response = app
            .clone()
            .oneshot(post_json(
                &format!("/api/exercises/{exercise_id}/sets"),
                serde_json::json!({ "rep": "10", "weight": "50" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let set = body_json(response).await;
        let set_id = set["id"].as_i64().unwrap();

        // Edit the existing set, add a heavier one.
        let response = app
            .clone()
            .oneshot(put_json(
                &format!("/api/workouts/{workout_id}"),
                serde_json::json!({
                    "title": "Leg Day",
                    "exercises": [{
                        "id": exercise_id,
                        "title": "Squat",
                        "sets": [
                            { "id": set_id, "rep": "12", "weight": "50" },
                            { "rep": "10", "weight": "55" }
                        ]
                    }]
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let updated = body_json(response).await;
        let exercise = &updated["exercises"][0];
        assert_eq!(exercise["sets"].as_array().unwrap().len(), 2);
        assert_eq!(exercise["sets"][0]["rep"], "12");
        assert!((exercise["max_weight"].as_f64().unwrap() - 55.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn workout_delete_keeps_exercise() {
        let app = test_app(None);

        let created = body_json(
            app.clone()
                .oneshot(post_json(
                    "/api/workouts",
                    serde_json::json!({ "title": "Push", "exercises": ["Bench"] }),
                ))
                .await
                .unwrap(),
        )
        .await;
        let workout_id = created["id"].as_i64().unwrap();
        let exercise_id = created["exercises"][0]["id"].as_i64().unwrap();

        let response = app
            .clone()
            .oneshot(
                axum::http::Request::delete(format!("/api/workouts/{workout_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(
                axum::http::Request::get(format!("/api/exercises/{exercise_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let exercise = body_json(response).await;
        assert!(exercise.get("workout_id").is_none());
    }

    #[tokio::test]
    async fn validation_error_returns_400() {
        let app = test_app(None);

        let response = app
            .oneshot(post_json(
                "/api/workouts",
                serde_json::json!({ "title": "" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("Title"));
    }

    #[tokio::test]
    async fn missing_row_returns_404() {
        let app = test_app(None);

        let response = app
            .oneshot(
                axum::http::Request::get("/api/workouts/999")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn bad_date_returns_400() {
        let app = test_app(None);

        let response = app
            .oneshot(
                axum::http::Request::get("/api/workouts/by-date/June-15")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn payment_lifecycle() {
        let app = test_app(None);

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/payments",
                serde_json::json!({
                    "title": "Rent",
                    "amount": "1200",
                    "due_date": "2024-06-01",
                    "completed_date": "2024-06-01"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let payment = body_json(response).await;
        let payment_id = payment["id"].as_i64().unwrap();
        let transaction_id = payment["transactions"][0]["id"].as_i64().unwrap();

        // Move the completing transaction instead of duplicating it.
        let response = app
            .clone()
            .oneshot(put_json(
                &format!("/api/payments/{payment_id}"),
                serde_json::json!({
                    "title": "Rent",
                    "amount": "1250",
                    "due_date": "2024-07-01",
                    "completed_date": "2024-07-02",
                    "transaction_id": transaction_id
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let updated = body_json(response).await;
        assert_eq!(updated["transactions"].as_array().unwrap().len(), 1);
        assert_eq!(updated["transactions"][0]["amount"], "1250");

        let response = app
            .clone()
            .oneshot(
                axum::http::Request::get("/api/payments/by-month/2024-07-15")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let july = body_json(response).await;
        assert_eq!(july.as_array().unwrap().len(), 1);

        let response = app
            .oneshot(
                axum::http::Request::delete(format!("/api/payments/{payment_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn on_disk_database_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tally.db");
        let path = path.to_string_lossy();

        {
            let svc = TallyService::new(&path).unwrap();
            svc.create_workout("local", "Leg Day", &["Squat".to_string()])
                .unwrap();
        }

        let svc = TallyService::new(&path).unwrap();
        let workouts = svc.get_all_workouts("local").unwrap();
        assert_eq!(workouts.len(), 1);
        assert_eq!(workouts[0].exercises[0].title, "Squat");
    }

    #[tokio::test]
    async fn stat_set_routes() {
        let app = test_app(None);

        let stat = body_json(
            app.clone()
                .oneshot(post_json(
                    "/api/stats",
                    serde_json::json!({ "title": "Bodyweight", "unit": "kg" }),
                ))
                .await
                .unwrap(),
        )
        .await;
        let stat_id = stat["id"].as_i64().unwrap();

        let set = body_json(
            app.clone()
                .oneshot(post_json(
                    &format!("/api/stats/{stat_id}/sets"),
                    serde_json::json!({ "value": "80" }),
                ))
                .await
                .unwrap(),
        )
        .await;
        let set_id = set["id"].as_i64().unwrap();

        let response = app
            .clone()
            .oneshot(put_json(
                &format!("/api/stat-sets/{set_id}"),
                serde_json::json!({ "value": "79.5" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let updated = body_json(response).await;
        assert_eq!(updated["value"], "79.5");

        let response = app
            .oneshot(
                axum::http::Request::delete(format!("/api/stat-sets/{set_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }
}
