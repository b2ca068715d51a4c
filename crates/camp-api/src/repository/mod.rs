//! Repository pattern for database operations.
//!
//! 데이터베이스 접근 로직을 라우트 핸들러에서 분리하여 관리합니다.
//! 모든 Repository는 static methods 패턴을 사용하며, 권한 검사용 멤버십 조회만
//! 교체 가능한 trait([`MembershipStore`])으로 제공합니다.

pub mod membership;
pub mod notes;
pub mod projects;
pub mod tasks;
pub mod users;

pub use membership::{
    InMemoryMembershipStore, MemberChange, MemberRecord, MemberRepository, MembershipStore,
    PgMembershipStore, StoreError,
};
pub use notes::{NoteRecord, NoteRepository};
pub use projects::{ProjectInput, ProjectRecord, ProjectRepository, ProjectSummary};
pub use tasks::{
    NewTask, SubtaskChanges, SubtaskRecord, TaskChanges, TaskRecord, TaskRepository,
    TaskWithCounts,
};
pub use users::{NewUser, UserProfile, UserRecord, UserRepository};
