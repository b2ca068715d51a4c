//! JWT 토큰 처리.
//!
//! Access Token 및 Refresh Token 생성/검증 로직.

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;
use uuid::Uuid;

/// Refresh Token의 `token_type` 값.
pub const REFRESH_TOKEN_TYPE: &str = "refresh";

/// JWT Access Token 페이로드.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - 사용자 ID
    pub sub: String,
    /// 사용자 이름
    pub username: String,
    /// Issued At - 토큰 발급 시간 (Unix timestamp)
    pub iat: i64,
    /// Expiration - 토큰 만료 시간 (Unix timestamp)
    pub exp: i64,
    /// JWT ID - 토큰 고유 식별자
    pub jti: String,
}

impl Claims {
    /// 새로운 Claims 생성.
    ///
    /// # Arguments
    ///
    /// * `user_id` - 사용자 ID
    /// * `username` - 사용자 이름
    /// * `expires_in_minutes` - 만료 시간 (분)
    pub fn new(user_id: Uuid, username: impl Into<String>, expires_in_minutes: i64) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id.to_string(),
            username: username.into(),
            iat: now.timestamp(),
            exp: (now + Duration::minutes(expires_in_minutes)).timestamp(),
            jti: Uuid::new_v4().to_string(),
        }
    }
}

/// Refresh Token 페이로드.
///
/// Access Token 갱신에 사용됩니다. `username`이 없으므로 Access Token으로
/// 디코딩되지 않습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// Subject - 사용자 ID
    pub sub: String,
    /// Issued At
    pub iat: i64,
    /// Expiration
    pub exp: i64,
    /// JWT ID
    pub jti: String,
    /// Token type
    pub token_type: String,
}

impl RefreshClaims {
    /// 새로운 Refresh Claims 생성.
    pub fn new(user_id: Uuid, expires_in_days: i64) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::days(expires_in_days)).timestamp(),
            jti: Uuid::new_v4().to_string(),
            token_type: REFRESH_TOKEN_TYPE.to_string(),
        }
    }
}

/// Access Token + Refresh Token 페어.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    /// Access Token
    pub access_token: String,
    /// Refresh Token
    pub refresh_token: String,
    /// Access Token 만료 시간 (초)
    pub expires_in: i64,
    /// 토큰 타입 (항상 "Bearer")
    pub token_type: String,
}

/// JWT 토큰 에러.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("토큰 인코딩 실패: {0}")]
    EncodingError(#[from] jsonwebtoken::errors::Error),
    #[error("토큰 디코딩 실패")]
    DecodingError,
    #[error("토큰이 만료되었습니다")]
    TokenExpired,
    #[error("잘못된 토큰 형식")]
    InvalidToken,
}

/// 서명/검증 키.
///
/// 시작 시 설정의 비밀 키로 한 번 생성하며, 이후 변경하지 않습니다.
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtKeys {
    /// HS256 비밀 키로 생성.
    pub fn from_secret(secret: &SecretString) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
        }
    }

    fn validation() -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);
        validation
    }
}

impl std::fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("JwtKeys([REDACTED])")
    }
}

/// Access Token 생성.
pub fn create_token(claims: &Claims, keys: &JwtKeys) -> Result<String, JwtError> {
    encode(&Header::new(Algorithm::HS256), claims, &keys.encoding).map_err(JwtError::from)
}

/// Refresh Token 생성.
pub fn create_refresh_token(claims: &RefreshClaims, keys: &JwtKeys) -> Result<String, JwtError> {
    encode(&Header::new(Algorithm::HS256), claims, &keys.encoding).map_err(JwtError::from)
}

/// Access Token + Refresh Token 쌍 생성.
///
/// # Arguments
///
/// * `user_id` - 사용자 ID
/// * `username` - 사용자 이름
/// * `keys` - 서명 키
/// * `access_expires_minutes` - Access Token 만료 시간 (분)
/// * `refresh_expires_days` - Refresh Token 만료 시간 (일)
pub fn create_token_pair(
    user_id: Uuid,
    username: &str,
    keys: &JwtKeys,
    access_expires_minutes: i64,
    refresh_expires_days: i64,
) -> Result<TokenPair, JwtError> {
    let access_claims = Claims::new(user_id, username, access_expires_minutes);
    let refresh_claims = RefreshClaims::new(user_id, refresh_expires_days);

    let access_token = create_token(&access_claims, keys)?;
    let refresh_token = create_refresh_token(&refresh_claims, keys)?;

    Ok(TokenPair {
        access_token,
        refresh_token,
        expires_in: access_expires_minutes * 60,
        token_type: "Bearer".to_string(),
    })
}

fn classify(err: jsonwebtoken::errors::Error) -> JwtError {
    match err.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::TokenExpired,
        jsonwebtoken::errors::ErrorKind::InvalidToken => JwtError::InvalidToken,
        _ => JwtError::DecodingError,
    }
}

/// Access Token 디코딩 및 검증.
pub fn decode_token(token: &str, keys: &JwtKeys) -> Result<TokenData<Claims>, JwtError> {
    decode::<Claims>(token, &keys.decoding, &JwtKeys::validation()).map_err(classify)
}

/// Refresh Token 디코딩 및 검증.
pub fn decode_refresh_token(
    token: &str,
    keys: &JwtKeys,
) -> Result<TokenData<RefreshClaims>, JwtError> {
    let data =
        decode::<RefreshClaims>(token, &keys.decoding, &JwtKeys::validation()).map_err(classify)?;
    if data.claims.token_type != REFRESH_TOKEN_TYPE {
        return Err(JwtError::InvalidToken);
    }
    Ok(data)
}

/// 저장용 Refresh Token 지문 (SHA-256 hex).
///
/// 원문 토큰은 DB에 저장하지 않습니다.
pub fn fingerprint(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
