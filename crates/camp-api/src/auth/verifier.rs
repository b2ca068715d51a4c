//! 자격증명 검증기.
//!
//! Bearer 토큰을 검증하여 [`Identity`]로 변환합니다. 저장소를 조회하지 않는
//! 무상태 검증이며, 실패 원인(누락/형식 오류/서명 오류/만료)은 모두
//! [`AuthError::Unauthenticated`] 하나로 합쳐 호출자에게 구분 신호를 주지 않습니다.

use std::sync::Arc;

use camp_core::Identity;
use uuid::Uuid;

use super::jwt::{decode_token, JwtError, JwtKeys};

/// 인증 실패.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("인증이 필요합니다")]
    Unauthenticated,
}

/// `Authorization` 헤더 값에서 Bearer 토큰 추출.
///
/// 스킴은 대소문자를 구분하지 않으며, 빈 토큰은 `None`입니다.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Access Token 검증기.
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    keys: Arc<JwtKeys>,
}

impl TokenVerifier {
    pub fn new(keys: Arc<JwtKeys>) -> Self {
        Self { keys }
    }

    /// `Authorization` 헤더 값 검증.
    pub fn verify(&self, header: Option<&str>) -> Result<Identity, AuthError> {
        let Some(header) = header else {
            tracing::debug!(cause = "missing", "Credential rejected");
            return Err(AuthError::Unauthenticated);
        };
        let Some(token) = bearer_token(header) else {
            tracing::debug!(cause = "scheme", "Credential rejected");
            return Err(AuthError::Unauthenticated);
        };
        self.verify_token(token)
    }

    /// 토큰 문자열 검증.
    pub fn verify_token(&self, token: &str) -> Result<Identity, AuthError> {
        let data = decode_token(token, &self.keys).map_err(|e| {
            let cause = match e {
                JwtError::TokenExpired => "expired",
                JwtError::InvalidToken => "malformed",
                _ => "signature",
            };
            tracing::debug!(cause, "Credential rejected");
            AuthError::Unauthenticated
        })?;

        let user_id = Uuid::parse_str(&data.claims.sub).map_err(|_| {
            tracing::debug!(cause = "subject", "Credential rejected");
            AuthError::Unauthenticated
        })?;

        Ok(Identity::new(user_id, data.claims.username))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{create_refresh_token, create_token, Claims, RefreshClaims};
    use secrecy::SecretString;

    fn keys(secret: &str) -> Arc<JwtKeys> {
        Arc::new(JwtKeys::from_secret(&SecretString::new(secret.to_string().into())))
    }

    const SECRET: &str = "verifier-test-secret-with-at-least-32-bytes";

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("bearer  abc "), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("abc"), None);
    }

    #[test]
    fn test_valid_token_yields_identity() {
        let verifier = TokenVerifier::new(keys(SECRET));
        let user_id = Uuid::new_v4();
        let token = create_token(&Claims::new(user_id, "alice", 5), &keys(SECRET)).unwrap();

        let identity = verifier
            .verify(Some(&format!("Bearer {}", token)))
            .unwrap();
        assert_eq!(identity.user_id, user_id);
        assert_eq!(identity.username, "alice");
    }

    #[test]
    fn test_all_failures_collapse_to_unauthenticated() {
        let verifier = TokenVerifier::new(keys(SECRET));
        let user_id = Uuid::new_v4();

        let mut expired = Claims::new(user_id, "alice", 5);
        expired.exp = chrono::Utc::now().timestamp() - 60;
        let expired = create_token(&expired, &keys(SECRET)).unwrap();

        let forged = create_token(
            &Claims::new(user_id, "alice", 5),
            &keys("another-secret-that-is-also-32-bytes-long"),
        )
        .unwrap();

        let refresh = create_refresh_token(&RefreshClaims::new(user_id, 1), &keys(SECRET)).unwrap();

        let mut bad_subject = Claims::new(user_id, "alice", 5);
        bad_subject.sub = "not-a-uuid".to_string();
        let bad_subject = create_token(&bad_subject, &keys(SECRET)).unwrap();

        let headers = [
            None,
            Some("Token abc".to_string()),
            Some("Bearer not.a.jwt".to_string()),
            Some(format!("Bearer {}", expired)),
            Some(format!("Bearer {}", forged)),
            Some(format!("Bearer {}", refresh)),
            Some(format!("Bearer {}", bad_subject)),
        ];

        for header in headers {
            assert_eq!(
                verifier.verify(header.as_deref()),
                Err(AuthError::Unauthenticated)
            );
        }
    }
}
