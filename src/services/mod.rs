//! Services layer - Business logic
//!
//! Services sit between the HTTP handlers and the repositories. They
//! validate domain rules, enforce ownership and translate storage errors
//! into [`ServiceError`] / [`UserServiceError`].

pub mod branch;
pub mod catalog;
pub mod category;
pub mod comment;
pub mod course_registration;
pub mod device;
pub mod edu_center;
pub mod email;
pub mod error;
pub mod like;
pub mod link;
pub mod otp;
pub mod password;
pub mod rate_limiter;
pub mod region;
pub mod resource;
pub mod token;
pub mod upload;
pub mod user;

pub use branch::{BranchService, CreateBranchInput};
pub use catalog::CatalogService;
pub use category::CategoryService;
pub use comment::CommentService;
pub use course_registration::{CourseRegistrationService, RegistrationRefs};
pub use device::parse_user_agent;
pub use edu_center::{CreateEduCenterInput, EduCenterService};
pub use email::EmailService;
pub use error::{ServiceError, ServiceResult};
pub use like::LikeService;
pub use link::LinkService;
pub use otp::OtpService;
pub use password::{hash_password, verify_password};
pub use rate_limiter::LoginRateLimiter;
pub use region::RegionService;
pub use resource::{CreateResourceInput, ResourceService};
pub use token::{AccessClaims, RefreshClaims, TokenPair, TokenService};
pub use upload::{FileStore, StoredFile, UploadError};
pub use user::{
    ClientInfo, LoginInput, LoginOutcome, RefreshOutcome, RegisterInput, UserService,
    UserServiceError,
};
