use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{
    error::{AppError, REGISTER_FAILED},
    state::AppState,
    users::{
        dto::{ApiResponse, LoginRequest, RegisterRequest},
        repo_types::AccountView,
        validation::{validate_login, validate_register},
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user", get(list_users))
        .route("/user/register", post(register))
        .route("/user/login", post(login))
}

pub const BODY_NOT_JSON: &str = "Request body must be valid JSON";
pub const BODY_NOT_OBJECT: &str = "Request body must be a JSON object";
pub const BODY_WRONG_CONTENT_TYPE: &str = "Content-Type must be application/json";

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    let rejection = match payload {
        Ok(Json(v)) => return Ok(v),
        Err(rejection) => rejection,
    };
    warn!(error = %rejection.body_text(), "rejected request body");
    let message = match rejection {
        JsonRejection::MissingJsonContentType(_) => BODY_WRONG_CONTENT_TYPE,
        JsonRejection::JsonDataError(_) => BODY_NOT_OBJECT,
        _ => BODY_NOT_JSON,
    };
    Err(AppError::BadRequest(message))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<AccountView>>), AppError> {
    let payload = body(payload)?;
    let creds = validate_register(&payload).map_err(|errors| {
        warn!(count = errors.len(), "register validation failed");
        AppError::Validation(errors)
    })?;

    let user = state
        .accounts
        .register(creds.email, creds.password)
        .await
        .map_err(|e| AppError::from_account(e, REGISTER_FAILED))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("User registered successfully", user)),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<AccountView>>, AppError> {
    let payload = body(payload)?;
    let creds = validate_login(&payload).map_err(|errors| {
        warn!(count = errors.len(), "login validation failed");
        AppError::Validation(errors)
    })?;

    let user = state.accounts.login(creds.email, creds.password).await?;
    Ok(Json(ApiResponse::ok("Login successful", user)))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<AccountView>>>, AppError> {
    let users = state.accounts.list_all().await?;
    Ok(Json(ApiResponse::ok("Users retrieved successfully", users)))
}
