//! Center-to-subject and center-to-field links
//!
//! Anyone may browse links; only the owner of the center (or staff) may
//! add or remove them.

use crate::db::repositories::{CatalogRepository, EduCenterRepository, LinkRepository};
use crate::models::{CatalogKind, EduLink, LinkFilter, LinkSort, ListParams, PagedResult, User};
use crate::services::edu_center::ensure_not_registered;
use crate::services::error::{ServiceError, ServiceResult};
use anyhow::Context;
use std::sync::Arc;

pub struct LinkService {
    repo: Arc<dyn LinkRepository>,
    catalog: Arc<dyn CatalogRepository>,
    centers: Arc<dyn EduCenterRepository>,
}

impl LinkService {
    pub fn new(
        repo: Arc<dyn LinkRepository>,
        catalog: Arc<dyn CatalogRepository>,
        centers: Arc<dyn EduCenterRepository>,
    ) -> Self {
        Self { repo, catalog, centers }
    }

    pub fn kind(&self) -> CatalogKind {
        self.repo.kind()
    }

    pub async fn create(&self, actor: &User, edu_center_id: i64, item_id: i64) -> ServiceResult<EduLink> {
        self.ensure_center_owner(actor, edu_center_id, true).await?;

        let item_exists = self
            .catalog
            .get_by_id(item_id)
            .await
            .context("Failed to get catalog item")?
            .is_some();
        if !item_exists {
            return Err(ServiceError::Validation(format!(
                "{} {} does not exist",
                self.kind(),
                item_id
            )));
        }

        self.repo.create(edu_center_id, item_id).await.map_err(|e| {
            ServiceError::from_write(
                e,
                format!(
                    "Education center {} is already linked to {} {}",
                    edu_center_id,
                    self.kind().to_string().to_lowercase(),
                    item_id
                ),
            )
        })
    }

    pub async fn get(&self, id: i64) -> ServiceResult<EduLink> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get link")?
            .ok_or_else(|| ServiceError::not_found("Link", id))
    }

    pub async fn delete(&self, actor: &User, id: i64) -> ServiceResult<()> {
        let link = self.get(id).await?;
        self.ensure_center_owner(actor, link.edu_center_id, false).await?;
        let item_id = link.item_id();
        ensure_not_registered(self.centers.as_ref(), link.edu_center_id, self.repo.kind(), |id| {
            id == item_id
        })
        .await?;

        self.repo.delete(id).await.context("Failed to delete link")?;
        Ok(())
    }

    pub async fn list(&self, filter: &LinkFilter, params: &ListParams<LinkSort>) -> ServiceResult<PagedResult<EduLink>> {
        let (links, total) = self.repo.list(filter, params).await.context("Failed to list links")?;
        Ok(PagedResult::new(links, total, params))
    }

    /// A missing center is a validation error in request bodies and a
    /// not-found error otherwise
    async fn ensure_center_owner(&self, actor: &User, edu_center_id: i64, from_body: bool) -> ServiceResult<()> {
        let center = self
            .centers
            .get_by_id(edu_center_id)
            .await
            .context("Failed to get education center")?;

        match center {
            None if from_body => Err(ServiceError::Validation(format!(
                "Education center {} does not exist",
                edu_center_id
            ))),
            None => Err(ServiceError::not_found("Education center", edu_center_id)),
            Some(center) if !actor.can_manage(center.user_id) => Err(ServiceError::Forbidden(
                "You can only manage links of your own education centers".to_string(),
            )),
            Some(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{
        insert_branch, insert_catalog_item, insert_center, insert_region, insert_user_model,
        migrated_pool,
    };
    use crate::db::repositories::{SqlxCatalogRepository, SqlxEduCenterRepository, SqlxLinkRepository};

    #[tokio::test]
    async fn test_link_lifecycle() {
        let pool = migrated_pool().await;
        let region = insert_region(&pool, "Tashkent").await;
        let owner = insert_user_model(&pool, 1, "ceo").await;
        let stranger = insert_user_model(&pool, 2, "ceo").await;
        let center = insert_center(&pool, "Star", region, owner.id).await;
        let math = insert_catalog_item(&pool, "subjects", "Math").await;
        let service = LinkService::new(
            SqlxLinkRepository::boxed(pool.clone(), CatalogKind::Subject),
            SqlxCatalogRepository::boxed(pool.clone(), CatalogKind::Subject),
            SqlxEduCenterRepository::boxed(pool.clone()),
        );

        assert!(matches!(
            service.create(&stranger, center, math).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            service.create(&owner, center, 999).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            service.create(&owner, 999, math).await,
            Err(ServiceError::Validation(_))
        ));

        let link = service.create(&owner, center, math).await.unwrap();
        assert_eq!(link.subject_id, Some(math));
        assert!(matches!(
            service.create(&owner, center, math).await,
            Err(ServiceError::Conflict(_))
        ));

        let page = service
            .list(
                &LinkFilter {
                    edu_center_id: Some(center),
                    ..Default::default()
                },
                &ListParams::default(),
            )
            .await
            .unwrap();
        assert_eq!(page.total, 1);

        assert!(matches!(
            service.delete(&stranger, link.id).await,
            Err(ServiceError::Forbidden(_))
        ));
        service.delete(&owner, link.id).await.unwrap();
        assert!(matches!(service.get(link.id).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_registered_field_link_cannot_be_removed() {
        let pool = migrated_pool().await;
        let region = insert_region(&pool, "Tashkent").await;
        let owner = insert_user_model(&pool, 1, "ceo").await;
        let student = insert_user_model(&pool, 2, "user").await;
        let center = insert_center(&pool, "Star", region, owner.id).await;
        let branch = insert_branch(&pool, "Chilanzar", region, center).await;
        let math = insert_catalog_item(&pool, "subjects", "Math").await;
        let it = insert_catalog_item(&pool, "fields", "IT").await;
        let service = LinkService::new(
            SqlxLinkRepository::boxed(pool.clone(), CatalogKind::Field),
            SqlxCatalogRepository::boxed(pool.clone(), CatalogKind::Field),
            SqlxEduCenterRepository::boxed(pool.clone()),
        );
        let link = service.create(&owner, center, it).await.unwrap();

        sqlx::query(
            "INSERT INTO course_registrations (user_id, edu_center_id, branch_id, subject_id, field_id) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(student.id)
        .bind(center)
        .bind(branch)
        .bind(math)
        .bind(it)
        .execute(pool.sqlite().unwrap())
        .await
        .unwrap();

        assert!(matches!(
            service.delete(&owner, link.id).await,
            Err(ServiceError::Conflict(_))
        ));
        assert!(service.get(link.id).await.is_ok());
    }
}
