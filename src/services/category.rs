//! Category service
//!
//! Resource categories: unique names, an image, and a refusal to delete a
//! category that still has resources.

use crate::db::repositories::CategoryRepository;
use crate::models::{Category, CategorySort, ListParams, PagedResult, UpdateCategoryInput};
use crate::services::error::{check_length, ServiceError, ServiceResult};
use anyhow::Context;
use std::sync::Arc;

pub struct CategoryService {
    repo: Arc<dyn CategoryRepository>,
}

impl CategoryService {
    pub fn new(repo: Arc<dyn CategoryRepository>) -> Self {
        Self { repo }
    }

    pub async fn create(&self, name: &str, image: &str) -> ServiceResult<Category> {
        let name = check_length("name", name, 2, 55)?;
        let image = required_image(image)?;

        self.repo
            .create(&name, &image)
            .await
            .map_err(|e| ServiceError::from_write(e, format!("Category '{}' already exists", name)))
    }

    pub async fn get(&self, id: i64) -> ServiceResult<Category> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get category")?
            .ok_or_else(|| ServiceError::not_found("Category", id))
    }

    pub async fn update(&self, id: i64, input: UpdateCategoryInput) -> ServiceResult<Category> {
        if input.name.is_none() && input.image.is_none() {
            return Err(ServiceError::Validation(
                "At least one field must be provided".to_string(),
            ));
        }

        let mut category = self.get(id).await?;
        if let Some(name) = input.name {
            category.name = check_length("name", &name, 2, 55)?;
        }
        if let Some(image) = input.image {
            category.image = required_image(&image)?;
        }

        self.repo
            .update(&category)
            .await
            .map_err(|e| ServiceError::from_write(e, format!("Category '{}' already exists", category.name)))
    }

    pub async fn delete(&self, id: i64) -> ServiceResult<()> {
        self.get(id).await?;

        let resources = self
            .repo
            .count_resources(id)
            .await
            .context("Failed to count category resources")?;
        if resources > 0 {
            return Err(ServiceError::Conflict(format!(
                "Category {} still has {} resource(s)",
                id, resources
            )));
        }

        self.repo
            .delete(id)
            .await
            .map_err(|e| ServiceError::from_write(e, "Category is still in use"))
    }

    pub async fn list(&self, params: &ListParams<CategorySort>) -> ServiceResult<PagedResult<Category>> {
        let (categories, total) = self.repo.list(params).await.context("Failed to list categories")?;
        Ok(PagedResult::new(categories, total, params))
    }
}

fn required_image(image: &str) -> ServiceResult<String> {
    let image = image.trim();
    if image.is_empty() {
        return Err(ServiceError::Validation("image is required".to_string()));
    }
    Ok(image.to_string())
}
