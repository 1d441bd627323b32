//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles CRUD operations for a specific entity.

pub mod branch;
pub mod catalog;
pub mod category;
pub mod comment;
pub mod course_registration;
pub mod edu_center;
pub mod like;
pub mod link;
pub mod region;
pub mod resource;
pub mod session;
pub mod user;

#[cfg(test)]
pub mod test_support;

pub use branch::{BranchRepository, SqlxBranchRepository};
pub use catalog::{CatalogRepository, SqlxCatalogRepository};
pub use category::{CategoryRepository, SqlxCategoryRepository};
pub use comment::{CommentRepository, SqlxCommentRepository};
pub use course_registration::{CourseRegistrationRepository, SqlxCourseRegistrationRepository};
pub use edu_center::{CenterStats, EduCenterRepository, SqlxEduCenterRepository};
pub use like::{LikeRepository, SqlxLikeRepository};
pub use link::{LinkRepository, SqlxLinkRepository};
pub use region::{RegionRepository, SqlxRegionRepository};
pub use resource::{ResourceRepository, SqlxResourceRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use user::{SqlxUserRepository, UserRepository};
