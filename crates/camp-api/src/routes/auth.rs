//! 인증 API.
//!
//! 회원가입, 로그인, 토큰 갱신, 로그아웃, 현재 사용자 조회, 비밀번호 변경.
//!
//! # 엔드포인트
//!
//! - `POST /api/v1/auth/register` - 회원가입
//! - `POST /api/v1/auth/login` - 로그인 (토큰 발급)
//! - `POST /api/v1/auth/refresh-token` - Access Token 갱신
//! - `POST /api/v1/auth/logout` - 로그아웃 (Refresh Token 무효화)
//! - `GET /api/v1/auth/current-user` - 현재 사용자
//! - `POST /api/v1/auth/change-password` - 비밀번호 변경

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::{
    create_token_pair, decode_refresh_token, fingerprint, hash_password_blocking,
    verify_password_blocking, AuthUser, PasswordError, TokenPair,
};
use crate::error::{ApiError, ApiErrorResponse, ApiResult};
use crate::repository::{NewUser, UserProfile, UserRecord, UserRepository};
use crate::routes::MessageResponse;
use crate::state::AppState;
use crate::validation::{validate_password, validate_username, ValidatedJson};

// ==================== 요청/응답 타입 ====================

/// 회원가입 요청.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    /// 사용자 이름 (소문자, 3-32자)
    #[validate(
        length(min = 3, max = 32, message = "사용자 이름은 3-32자여야 합니다"),
        custom(function = "validate_username")
    )]
    pub username: String,
    #[validate(email(message = "올바른 이메일 형식이 아닙니다"))]
    pub email: String,
    #[validate(custom(function = "validate_password"))]
    pub password: String,
    #[serde(default)]
    #[validate(length(max = 100, message = "이름은 100자를 넘을 수 없습니다"))]
    pub full_name: Option<String>,
}

/// 로그인 요청 (username 또는 email).
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "아이디를 입력하세요"))]
    pub login: String,
    #[validate(length(min = 1, message = "비밀번호를 입력하세요"))]
    pub password: String,
}

/// 로그인 응답.
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub user: UserProfile,
    pub tokens: TokenPair,
}

/// 토큰 갱신 요청.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RefreshTokenRequest {
    #[validate(length(min = 1, message = "Refresh Token이 필요합니다"))]
    pub refresh_token: String,
}

/// 비밀번호 변경 요청.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "현재 비밀번호를 입력하세요"))]
    pub current_password: String,
    #[validate(custom(function = "validate_password"))]
    pub new_password: String,
}

// ==================== 헬퍼 ====================

/// 토큰 쌍 발급 후 Refresh Token 지문 저장.
async fn issue_tokens(state: &AppState, user: &UserRecord) -> ApiResult<TokenPair> {
    let pool = state.pool()?;

    let tokens = create_token_pair(
        user.id,
        &user.username,
        &state.keys,
        state.access_token_ttl_minutes,
        state.refresh_token_ttl_days,
    )
    .map_err(|e| ApiError::Internal(e.into()))?;

    UserRepository::set_refresh_token_hash(pool, user.id, Some(&fingerprint(&tokens.refresh_token)))
        .await?;

    Ok(tokens)
}

fn password_error(err: PasswordError) -> ApiError {
    ApiError::Internal(err.into())
}

// ==================== 핸들러 ====================

/// 회원가입.
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "가입 완료", body = UserProfile),
        (status = 409, description = "username/email 중복", body = ApiErrorResponse),
        (status = 422, description = "검증 실패", body = ApiErrorResponse)
    )
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<UserProfile>)> {
    let pool = state.pool()?;
    info!("회원가입: {}", request.username);

    let password_hash = hash_password_blocking(request.password)
        .await
        .map_err(password_error)?;

    let user = UserRepository::create(
        pool,
        NewUser {
            username: request.username,
            email: request.email.to_lowercase(),
            full_name: request.full_name,
            password_hash,
        },
    )
    .await
    .map_err(|e| match ApiError::from(e) {
        ApiError::Conflict(_) => {
            ApiError::Conflict("이미 사용 중인 사용자 이름 또는 이메일입니다".to_string())
        }
        other => other,
    })?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// 로그인.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "로그인 성공", body = LoginResponse),
        (status = 401, description = "아이디 또는 비밀번호 불일치", body = ApiErrorResponse)
    )
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let pool = state.pool()?;

    let login = request.login.trim().to_lowercase();
    let Some(user) = UserRepository::find_by_login(pool, &login).await? else {
        debug!("로그인 실패: 존재하지 않는 사용자");
        return Err(ApiError::InvalidCredentials);
    };

    match verify_password_blocking(request.password, user.password_hash.clone()).await {
        Ok(()) => {}
        Err(PasswordError::Mismatch) => {
            debug!(user_id = %user.id, "로그인 실패: 비밀번호 불일치");
            return Err(ApiError::InvalidCredentials);
        }
        Err(e) => return Err(password_error(e)),
    }

    let tokens = issue_tokens(&state, &user).await?;
    info!(user_id = %user.id, "로그인: {}", user.username);

    Ok(Json(LoginResponse {
        user: user.into(),
        tokens,
    }))
}

/// Access Token 갱신.
///
/// Refresh Token은 사용할 때마다 교체되며, 이전 토큰은 다시 사용할 수 없습니다.
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh-token",
    tag = "auth",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "새 토큰 쌍", body = TokenPair),
        (status = 401, description = "유효하지 않은 Refresh Token", body = ApiErrorResponse)
    )
)]
pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<RefreshTokenRequest>,
) -> ApiResult<Json<TokenPair>> {
    let pool = state.pool()?;

    let data = decode_refresh_token(&request.refresh_token, &state.keys).map_err(|e| {
        debug!(error = %e, "Refresh token rejected");
        ApiError::Unauthenticated
    })?;
    let user_id = uuid::Uuid::parse_str(&data.claims.sub).map_err(|_| ApiError::Unauthenticated)?;

    let user = UserRepository::find_by_id(pool, user_id)
        .await?
        .ok_or(ApiError::Unauthenticated)?;

    let presented = fingerprint(&request.refresh_token);
    if user.refresh_token_hash.as_deref() != Some(presented.as_str()) {
        debug!(%user_id, "Refresh token does not match stored fingerprint");
        return Err(ApiError::Unauthenticated);
    }

    let tokens = create_token_pair(
        user.id,
        &user.username,
        &state.keys,
        state.access_token_ttl_minutes,
        state.refresh_token_ttl_days,
    )
    .map_err(|e| ApiError::Internal(e.into()))?;

    let rotated = UserRepository::rotate_refresh_token_hash(
        pool,
        user.id,
        &presented,
        &fingerprint(&tokens.refresh_token),
    )
    .await?;
    if !rotated {
        return Err(ApiError::Unauthenticated);
    }

    Ok(Json(tokens))
}

/// 로그아웃.
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "로그아웃 완료", body = MessageResponse),
        (status = 401, description = "인증 필요", body = ApiErrorResponse)
    )
)]
pub async fn logout(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
) -> ApiResult<Json<MessageResponse>> {
    let pool = state.pool()?;
    UserRepository::set_refresh_token_hash(pool, identity.user_id, None).await?;
    info!(user_id = %identity.user_id, "로그아웃");

    Ok(Json(MessageResponse::new("로그아웃되었습니다")))
}

/// 현재 사용자.
#[utoipa::path(
    get,
    path = "/api/v1/auth/current-user",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "현재 사용자", body = UserProfile),
        (status = 401, description = "인증 필요", body = ApiErrorResponse)
    )
)]
pub async fn current_user(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
) -> ApiResult<Json<UserProfile>> {
    let pool = state.pool()?;
    let user = UserRepository::find_by_id(pool, identity.user_id)
        .await?
        .ok_or(ApiError::Unauthenticated)?;

    Ok(Json(user.into()))
}

/// 비밀번호 변경.
///
/// 변경 후 기존 Refresh Token은 모두 무효화됩니다.
#[utoipa::path(
    post,
    path = "/api/v1/auth/change-password",
    tag = "auth",
    security(("bearer_auth" = [])),
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "변경 완료", body = MessageResponse),
        (status = 400, description = "현재 비밀번호 불일치", body = ApiErrorResponse),
        (status = 422, description = "검증 실패", body = ApiErrorResponse)
    )
)]
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
    ValidatedJson(request): ValidatedJson<ChangePasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let pool = state.pool()?;

    if request.current_password == request.new_password {
        return Err(ApiError::BadRequest(
            "새 비밀번호는 현재 비밀번호와 달라야 합니다".to_string(),
        ));
    }

    let user = UserRepository::find_by_id(pool, identity.user_id)
        .await?
        .ok_or(ApiError::Unauthenticated)?;

    match verify_password_blocking(request.current_password, user.password_hash).await {
        Ok(()) => {}
        Err(PasswordError::Mismatch) => {
            return Err(ApiError::BadRequest(
                "현재 비밀번호가 올바르지 않습니다".to_string(),
            ))
        }
        Err(e) => return Err(password_error(e)),
    }

    let password_hash = hash_password_blocking(request.new_password)
        .await
        .map_err(password_error)?;
    UserRepository::update_password(pool, identity.user_id, &password_hash).await?;
    info!(user_id = %identity.user_id, "비밀번호 변경");

    Ok(Json(MessageResponse::new("비밀번호가 변경되었습니다")))
}

// ==================== 라우터 ====================

/// 인증 라우터.
pub fn auth_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh-token", post(refresh_token))
        .route("/logout", post(logout))
        .route("/current-user", get(current_user))
        .route("/change-password", post(change_password))
}
