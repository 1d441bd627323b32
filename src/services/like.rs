//! Like service

use crate::db::repositories::{EduCenterRepository, LikeRepository};
use crate::models::{Like, LikeFilter, LikeSort, ListParams, PagedResult, User};
use crate::services::error::{ServiceError, ServiceResult};
use anyhow::Context;
use std::sync::Arc;

pub struct LikeService {
    repo: Arc<dyn LikeRepository>,
    centers: Arc<dyn EduCenterRepository>,
}

impl LikeService {
    pub fn new(repo: Arc<dyn LikeRepository>, centers: Arc<dyn EduCenterRepository>) -> Self {
        Self { repo, centers }
    }

    /// Like a center once
    pub async fn create(&self, user: &User, edu_center_id: i64) -> ServiceResult<Like> {
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

        self.repo.create(user.id, edu_center_id).await.map_err(|e| {
            ServiceError::from_write(e, format!("You already liked education center {}", edu_center_id))
        })
    }

    pub async fn get(&self, id: i64) -> ServiceResult<Like> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get like")?
            .ok_or_else(|| ServiceError::not_found("Like", id))
    }

    pub async fn delete(&self, actor: &User, id: i64) -> ServiceResult<()> {
        let like = self.get(id).await?;
        if !actor.can_manage(like.user_id) {
            return Err(ServiceError::Forbidden(
                "You can only remove your own likes".to_string(),
            ));
        }

        self.repo.delete(id).await.context("Failed to delete like")?;
        Ok(())
    }

    pub async fn list(&self, filter: &LikeFilter, params: &ListParams<LikeSort>) -> ServiceResult<PagedResult<Like>> {
        let (likes, total) = self.repo.list(filter, params).await.context("Failed to list likes")?;
        Ok(PagedResult::new(likes, total, params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{insert_center, insert_region, insert_user_model, migrated_pool};
    use crate::db::repositories::{SqlxEduCenterRepository, SqlxLikeRepository};

    #[tokio::test]
    async fn test_like_once_and_unlike() {
        let pool = migrated_pool().await;
        let region = insert_region(&pool, "Tashkent").await;
        let owner = insert_user_model(&pool, 1, "ceo").await;
        let fan = insert_user_model(&pool, 2, "user").await;
        let center = insert_center(&pool, "Star", region, owner.id).await;
        let service = LikeService::new(
            SqlxLikeRepository::boxed(pool.clone()),
            SqlxEduCenterRepository::boxed(pool.clone()),
        );

        let like = service.create(&fan, center).await.unwrap();
        assert_eq!(like.edu_center_name, "Star");
        assert!(matches!(service.create(&fan, center).await, Err(ServiceError::Conflict(_))));
        assert!(matches!(service.create(&fan, 999).await, Err(ServiceError::Validation(_))));

        let page = service
            .list(
                &LikeFilter {
                    edu_center_id: Some(center),
                    ..Default::default()
                },
                &ListParams::default(),
            )
            .await
            .unwrap();
        assert_eq!(page.total, 1);

        assert!(matches!(service.delete(&owner, like.id).await, Err(ServiceError::Forbidden(_))));
        service.delete(&fan, like.id).await.unwrap();
        assert!(matches!(service.get(like.id).await, Err(ServiceError::NotFound(_))));
    }
}
