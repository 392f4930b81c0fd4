use std::future::{ready, Future, Ready};

use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{web, FromRequest, HttpRequest, HttpResponse};
use validator::Validate;

use tally_models::auth::{
    GoogleSignInRequest, RefreshRequest, SettingsPayload, SignInRequest, SignUpRequest, Token, TokenPairResponse,
    UserResponse,
};
use tally_models::error::{slugs, AppError, AppResult};

use super::error::{validation_error, ApiError};
use crate::AppState;

/// Caller identified by a valid `Authorization: Bearer <access token>`.
pub struct Authenticated(pub Token);

impl FromRequest for Authenticated {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

fn authenticate(req: &HttpRequest) -> Result<Authenticated, ApiError> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| AppError::unknown("Application state is not configured", slugs::INTERNAL_SERVER_ERROR))?;

    let raw = bearer_token(req)?;
    let token = state.auth.validate_access(raw)?;
    Ok(Authenticated(token))
}

fn bearer_token(req: &HttpRequest) -> Result<&str, ApiError> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::authorization("Missing bearer token", slugs::INVALID_TOKEN).into())
}

/// Runs one orchestrator call under the configured request deadline.
async fn within_deadline<T>(state: &AppState, operation: impl Future<Output = AppResult<T>>) -> Result<T, ApiError> {
    match tokio::time::timeout(state.request_timeout, operation).await {
        Ok(result) => result.map_err(ApiError::from),
        Err(_) => {
            tracing::warn!(timeout = ?state.request_timeout, "Request deadline exceeded");
            Err(AppError::unknown("Request timed out", slugs::REQUEST_TIMEOUT).into())
        }
    }
}

pub async fn sign_in(
    state: web::Data<AppState>,
    request: web::Json<SignInRequest>,
) -> Result<HttpResponse, ApiError> {
    let tokens = within_deadline(&state, state.auth.sign_in(&request.email, &request.password)).await?;
    Ok(HttpResponse::Ok().json(TokenPairResponse::from(tokens)))
}

pub async fn sign_up(
    state: web::Data<AppState>,
    request: web::Json<SignUpRequest>,
) -> Result<HttpResponse, ApiError> {
    request.validate().map_err(|e| validation_error(&e))?;

    let tokens = within_deadline(
        &state,
        state.auth.sign_up(&request.email, &request.password, &request.name),
    )
    .await?;
    Ok(HttpResponse::Ok().json(TokenPairResponse::from(tokens)))
}

pub async fn refresh(
    state: web::Data<AppState>,
    request: web::Json<RefreshRequest>,
) -> Result<HttpResponse, ApiError> {
    request.validate().map_err(|e| validation_error(&e))?;

    let tokens = within_deadline(&state, state.auth.refresh(&request.refresh)).await?;
    Ok(HttpResponse::Ok().json(TokenPairResponse::from(tokens)))
}

pub async fn google_sign_in(
    state: web::Data<AppState>,
    request: web::Json<GoogleSignInRequest>,
) -> Result<HttpResponse, ApiError> {
    let tokens = within_deadline(&state, state.auth.google_sign_in(&request.credential)).await?;
    Ok(HttpResponse::Ok().json(TokenPairResponse::from(tokens)))
}

pub async fn get_current_user(
    state: web::Data<AppState>,
    caller: Authenticated,
) -> Result<HttpResponse, ApiError> {
    let user = within_deadline(&state, state.auth.get_user(caller.0.user_id)).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(&user)))
}

pub async fn update_settings(
    state: web::Data<AppState>,
    caller: Authenticated,
    request: web::Json<SettingsPayload>,
) -> Result<HttpResponse, ApiError> {
    request.validate().map_err(|e| validation_error(&e))?;

    let user = within_deadline(
        &state,
        state.auth.update_settings(
            caller.0.user_id,
            &request.currency,
            &request.first_day_of_week,
            &request.profile_picture_url,
        ),
    )
    .await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(&user)))
}
