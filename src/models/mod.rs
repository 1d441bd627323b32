//! Data models
//!
//! Database entities, their partial-update inputs, list filters and sort
//! whitelists for the education center directory.

mod branch;
mod catalog;
mod category;
mod comment;
mod course_registration;
mod edu_center;
mod like;
mod link;
mod pagination;
mod region;
mod resource;
mod session;
mod user;

pub use branch::{Branch, BranchDetails, BranchFilter, BranchSort, NewBranch, UpdateBranchInput};
pub use catalog::{CatalogItem, CatalogKind, CatalogSort, UpdateCatalogInput};
pub use category::{Category, CategorySort, UpdateCategoryInput};
pub use comment::{Comment, CommentFilter, CommentSort, UpdateCommentInput, MAX_STAR, MIN_STAR};
pub use course_registration::{
    CourseRegistration, RegistrationFilter, RegistrationSort, RegistrationTarget,
    UpdateRegistrationInput,
};
pub use edu_center::{
    EduCenter, EduCenterDetails, EduCenterFilter, EduCenterSort, NewEduCenter,
    UpdateEduCenterInput,
};
pub use like::{Like, LikeFilter, LikeSort};
pub use link::{EduLink, LinkFilter, LinkSort};
pub use pagination::{ListParams, PagedResult, SortField, SortOrder, DEFAULT_LIMIT, MAX_LIMIT};
pub use region::{Region, RegionSort};
pub use resource::{NewResource, Resource, ResourceFilter, ResourceSort, UpdateResourceInput};
pub use session::{DeviceInfo, Session, SessionView};
pub use user::{UpdateUserInput, User, UserFilter, UserRole, UserStatus, UserSort};
