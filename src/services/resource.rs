//! Resource service
//!
//! Learning resources shared by users. Anyone signed in may publish one;
//! only its author or staff may change or delete it.

use crate::db::repositories::{CategoryRepository, ResourceRepository};
use crate::models::{
    ListParams, NewResource, PagedResult, Resource, ResourceFilter, ResourceSort,
    UpdateResourceInput, User,
};
use crate::services::error::{check_length, ServiceError, ServiceResult};
use anyhow::Context;
use std::sync::Arc;

/// Fields of a new resource supplied by the caller
#[derive(Debug, Clone)]
pub struct CreateResourceInput {
    pub name: String,
    pub media: String,
    pub description: String,
    pub category_id: i64,
}

pub struct ResourceService {
    repo: Arc<dyn ResourceRepository>,
    categories: Arc<dyn CategoryRepository>,
}

impl ResourceService {
    pub fn new(repo: Arc<dyn ResourceRepository>, categories: Arc<dyn CategoryRepository>) -> Self {
        Self { repo, categories }
    }

    pub async fn create(&self, author: &User, input: CreateResourceInput) -> ServiceResult<Resource> {
        let new = NewResource {
            name: check_length("name", &input.name, 2, 100)?,
            media: check_length("media", &input.media, 1, 255)?,
            description: input.description.trim().to_string(),
            category_id: input.category_id,
            user_id: author.id,
        };
        self.ensure_category(new.category_id).await?;

        let resource = self
            .repo
            .create(&new)
            .await
            .map_err(|e| ServiceError::from_write(e, "Resource already exists"))?;

        tracing::info!("User {} published resource {}", author.id, resource.id);
        Ok(resource)
    }

    pub async fn get(&self, id: i64) -> ServiceResult<Resource> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get resource")?
            .ok_or_else(|| ServiceError::not_found("Resource", id))
    }

    pub async fn update(&self, actor: &User, id: i64, input: UpdateResourceInput) -> ServiceResult<Resource> {
        if input.is_empty() {
            return Err(ServiceError::Validation(
                "At least one field must be provided".to_string(),
            ));
        }

        let mut resource = self.get(id).await?;
        if !actor.can_manage(resource.user_id) {
            return Err(ServiceError::Forbidden(
                "You can only edit your own resources".to_string(),
            ));
        }

        if let Some(name) = input.name {
            resource.name = check_length("name", &name, 2, 100)?;
        }
        if let Some(media) = input.media {
            resource.media = check_length("media", &media, 1, 255)?;
        }
        if let Some(description) = input.description {
            resource.description = description.trim().to_string();
        }
        if let Some(category_id) = input.category_id {
            self.ensure_category(category_id).await?;
            resource.category_id = category_id;
        }

        self.repo
            .update(&resource)
            .await
            .map_err(|e| ServiceError::from_write(e, "Resource already exists"))
    }

    pub async fn delete(&self, actor: &User, id: i64) -> ServiceResult<()> {
        let resource = self.get(id).await?;
        if !actor.can_manage(resource.user_id) {
            return Err(ServiceError::Forbidden(
                "You can only delete your own resources".to_string(),
            ));
        }

        self.repo.delete(id).await.context("Failed to delete resource")?;
        Ok(())
    }

    pub async fn list(
        &self,
        filter: &ResourceFilter,
        params: &ListParams<ResourceSort>,
    ) -> ServiceResult<PagedResult<Resource>> {
        let (resources, total) = self
            .repo
            .list(filter, params)
            .await
            .context("Failed to list resources")?;

        Ok(PagedResult::new(resources, total, params))
    }

    async fn ensure_category(&self, category_id: i64) -> ServiceResult<()> {
        let exists = self
            .categories
            .get_by_id(category_id)
            .await
            .context("Failed to get category")?
            .is_some();
        if !exists {
            return Err(ServiceError::Validation(format!(
                "Category {} does not exist",
                category_id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{insert_user_model, migrated_pool};
    use crate::db::repositories::{SqlxCategoryRepository, SqlxResourceRepository};
    use crate::db::DynDatabasePool;

    async fn setup() -> (DynDatabasePool, ResourceService, i64) {
        let pool = migrated_pool().await;
        let categories = SqlxCategoryRepository::boxed(pool.clone());
        let category = categories.create("Books", "/uploads/books.png").await.unwrap();
        let service = ResourceService::new(SqlxResourceRepository::boxed(pool.clone()), categories);
        (pool, service, category.id)
    }

    async fn user(pool: &DynDatabasePool, n: u32, role: &str) -> User {
        insert_user_model(pool, n, role).await
    }

    fn input(category_id: i64) -> CreateResourceInput {
        CreateResourceInput {
            name: "Algebra notes".into(),
            media: "https://example.com/algebra.pdf".into(),
            description: "Chapter one".into(),
            category_id,
        }
    }

    #[tokio::test]
    async fn test_create_includes_names() {
        let (pool, service, category) = setup().await;
        let author = user(&pool, 1, "user").await;

        let resource = service.create(&author, input(category)).await.unwrap();

        assert_eq!(resource.user_id, author.id);
        assert_eq!(resource.category_name, "Books");
        assert_eq!(resource.user_full_name, "User 1");
    }

    #[tokio::test]
    async fn test_unknown_category_is_validation_error() {
        let (pool, service, _) = setup().await;
        let author = user(&pool, 1, "user").await;

        assert!(matches!(
            service.create(&author, input(999)).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_only_owner_or_staff_may_modify() {
        let (pool, service, category) = setup().await;
        let author = user(&pool, 1, "user").await;
        let stranger = user(&pool, 2, "user").await;
        let staff = user(&pool, 3, "super-admin").await;
        let resource = service.create(&author, input(category)).await.unwrap();

        let rename = || UpdateResourceInput {
            name: Some("Geometry".into()),
            ..Default::default()
        };
        assert!(matches!(
            service.update(&stranger, resource.id, rename()).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert_eq!(service.update(&author, resource.id, rename()).await.unwrap().name, "Geometry");
        assert!(matches!(
            service.update(&author, resource.id, UpdateResourceInput::default()).await,
            Err(ServiceError::Validation(_))
        ));

        assert!(matches!(
            service.delete(&stranger, resource.id).await,
            Err(ServiceError::Forbidden(_))
        ));
        service.delete(&staff, resource.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_filters_by_user() {
        let (pool, service, category) = setup().await;
        let a = user(&pool, 1, "user").await;
        let b = user(&pool, 2, "user").await;
        service.create(&a, input(category)).await.unwrap();
        service.create(&b, input(category)).await.unwrap();

        let page = service
            .list(
                &ResourceFilter {
                    user_id: Some(b.id),
                    ..Default::default()
                },
                &ListParams::default(),
            )
            .await
            .unwrap();

        assert_eq!(page.total, 1);
        assert_eq!(page.data[0].user_id, b.id);
    }
}
