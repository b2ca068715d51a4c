//! # Camp Core
//!
//! ProjectCamp 백엔드의 핵심 도메인 타입을 제공합니다.
//!
//! 이 크레이트는 API 서버 전반에서 사용되는 기본 타입을 제공합니다:
//! - 프로젝트 역할(`ProjectRole`)과 역할 집합(`RoleSet`)
//! - 인증된 사용자 식별자(`Identity`)
//! - 작업 상태(`TaskStatus`)
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;

pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
