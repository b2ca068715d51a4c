//! 도메인 모델.

mod identity;
mod role;
mod task;

pub use identity::Identity;
pub use role::{ProjectRole, RoleSet};
pub use task::TaskStatus;
