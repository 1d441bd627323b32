//! Comment service
//!
//! Reviews of education centers: a text of 2 to 250 characters and a star
//! rating from 0 to 5. Only the author edits a review; the author or staff
//! may delete it.

use crate::db::repositories::{CommentRepository, EduCenterRepository};
use crate::models::{
    Comment, CommentFilter, CommentSort, ListParams, PagedResult, UpdateCommentInput, User,
    MAX_STAR, MIN_STAR,
};
use crate::services::error::{check_length, ServiceError, ServiceResult};
use anyhow::Context;
use std::sync::Arc;

pub struct CommentService {
    repo: Arc<dyn CommentRepository>,
    centers: Arc<dyn EduCenterRepository>,
}

impl CommentService {
    pub fn new(repo: Arc<dyn CommentRepository>, centers: Arc<dyn EduCenterRepository>) -> Self {
        Self { repo, centers }
    }

    pub async fn create(&self, author: &User, edu_center_id: i64, comment: &str, star: i32) -> ServiceResult<Comment> {
        let comment = check_length("comment", comment, 2, 250)?;
        check_star(star)?;

        let center_exists = self
            .centers
            .get_by_id(edu_center_id)
            .await
            .context("Failed to get education center")?
            .is_some();
        if !center_exists {
            return Err(ServiceError::Validation(format!(
                "Education center {} does not exist",
                edu_center_id
            )));
        }

        self.repo
            .create(author.id, edu_center_id, &comment, star)
            .await
            .map_err(|e| ServiceError::from_write(e, "Comment already exists"))
    }

    pub async fn get(&self, id: i64) -> ServiceResult<Comment> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get comment")?
            .ok_or_else(|| ServiceError::not_found("Comment", id))
    }

    /// Edit a comment; staff cannot rewrite other people's reviews
    pub async fn update(&self, author: &User, id: i64, input: UpdateCommentInput) -> ServiceResult<Comment> {
        if input.comment.is_none() && input.star.is_none() {
            return Err(ServiceError::Validation(
                "At least one field must be provided".to_string(),
            ));
        }

        let mut comment = self.get(id).await?;
        if comment.user_id != author.id {
            return Err(ServiceError::Forbidden(
                "You can only edit your own comments".to_string(),
            ));
        }

        if let Some(text) = input.comment {
            comment.comment = check_length("comment", &text, 2, 250)?;
        }
        if let Some(star) = input.star {
            check_star(star)?;
            comment.star = star;
        }

        Ok(self.repo.update(&comment).await.context("Failed to update comment")?)
    }

    pub async fn delete(&self, actor: &User, id: i64) -> ServiceResult<()> {
        let comment = self.get(id).await?;
        if !actor.can_manage(comment.user_id) {
            return Err(ServiceError::Forbidden(
                "You can only delete your own comments".to_string(),
            ));
        }

        self.repo.delete(id).await.context("Failed to delete comment")?;
        Ok(())
    }

    pub async fn list(&self, filter: &CommentFilter, params: &ListParams<CommentSort>) -> ServiceResult<PagedResult<Comment>> {
        let (comments, total) = self
            .repo
            .list(filter, params)
            .await
            .context("Failed to list comments")?;

        Ok(PagedResult::new(comments, total, params))
    }
}

fn check_star(star: i32) -> ServiceResult<()> {
    if !(MIN_STAR..=MAX_STAR).contains(&star) {
        return Err(ServiceError::Validation(format!(
            "star must be between {} and {}",
            MIN_STAR, MAX_STAR
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{insert_center, insert_region, insert_user_model, migrated_pool};
    use crate::db::repositories::{SqlxCommentRepository, SqlxEduCenterRepository};
    use proptest::prelude::*;

    #[tokio::test]
    async fn test_comment_rules() {
        let pool = migrated_pool().await;
        let region = insert_region(&pool, "Tashkent").await;
        let owner = insert_user_model(&pool, 1, "ceo").await;
        let author = insert_user_model(&pool, 2, "user").await;
        let staff = insert_user_model(&pool, 3, "admin").await;
        let center = insert_center(&pool, "Star", region, owner.id).await;
        let service = CommentService::new(
            SqlxCommentRepository::boxed(pool.clone()),
            SqlxEduCenterRepository::boxed(pool.clone()),
        );

        assert!(matches!(
            service.create(&author, center, "x", 3).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            service.create(&author, center, "Nice", 6).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            service.create(&author, 999, "Nice", 4).await,
            Err(ServiceError::Validation(_))
        ));

        let comment = service.create(&author, center, " Great teachers ", 5).await.unwrap();
        assert_eq!(comment.comment, "Great teachers");
        assert_eq!(comment.user_full_name, "User 2");

        let edit = UpdateCommentInput {
            star: Some(4),
            ..Default::default()
        };
        assert!(matches!(
            service.update(&staff, comment.id, edit.clone()).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert_eq!(service.update(&author, comment.id, edit).await.unwrap().star, 4);

        assert!(matches!(
            service.delete(&owner, comment.id).await,
            Err(ServiceError::Forbidden(_))
        ));
        service.delete(&staff, comment.id).await.unwrap();
    }

    proptest! {
        #[test]
        fn prop_star_range(star in -20i32..20) {
            prop_assert_eq!(check_star(star).is_ok(), (0..=5).contains(&star));
        }
    }
}
