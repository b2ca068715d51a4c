//! 인증된 사용자 식별자.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 검증된 세션 토큰에서 얻은 사용자 식별 정보.
///
/// 프로필 필드와 역할은 포함하지 않습니다. 역할은 프로젝트마다 다르므로
/// 요청 시점에 멤버십 저장소에서 조회합니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    /// 사용자 ID (불변)
    pub user_id: Uuid,
    /// 사용자 이름
    pub username: String,
}

impl Identity {
    pub fn new(user_id: Uuid, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
        }
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.username, self.user_id)
    }
}
