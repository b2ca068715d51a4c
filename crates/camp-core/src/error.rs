//! 도메인 에러 타입.
//!
//! 설정 로드와 도메인 값 파싱 과정에서 발생하는 에러를 정의합니다.

use thiserror::Error;

/// 핵심 도메인 에러.
#[derive(Debug, Error)]
pub enum CampError {
    /// 설정 에러
    #[error("설정 에러: {0}")]
    Config(String),

    /// 알 수 없는 프로젝트 역할 문자열
    #[error("알 수 없는 역할: {0}")]
    UnknownRole(String),

    /// 알 수 없는 작업 상태 문자열
    #[error("알 수 없는 작업 상태: {0}")]
    UnknownTaskStatus(String),

    /// 라우트 정책 선언 오류
    #[error("라우트 정책 에러: {0}")]
    Policy(String),
}

/// 도메인 작업을 위한 Result 타입.
pub type CampResult<T> = Result<T, CampError>;

impl From<config::ConfigError> for CampError {
    fn from(err: config::ConfigError) -> Self {
        CampError::Config(err.to_string())
    }
}
