//! Subject and field catalog service
//!
//! One service type serves both catalogs; the [`CatalogKind`] of its
//! repository decides the table and the upload directory. Images are
//! stored by the API layer first; this service owns their lifetime after
//! that and removes replaced or orphaned files.

use crate::db::repositories::CatalogRepository;
use crate::models::{CatalogItem, CatalogKind, CatalogSort, ListParams, PagedResult, UpdateCatalogInput};
use crate::services::error::{check_length, ServiceError, ServiceResult};
use crate::services::upload::FileStore;
use anyhow::Context;
use std::sync::Arc;

pub struct CatalogService {
    repo: Arc<dyn CatalogRepository>,
    files: Arc<FileStore>,
}

impl CatalogService {
    pub fn new(repo: Arc<dyn CatalogRepository>, files: Arc<FileStore>) -> Self {
        Self { repo, files }
    }

    pub fn kind(&self) -> CatalogKind {
        self.repo.kind()
    }

    pub async fn create(&self, name: &str, image: &str) -> ServiceResult<CatalogItem> {
        let name = check_length("name", name, 3, 100)?;

        let item = self
            .repo
            .create(&name, image)
            .await
            .map_err(|e| ServiceError::from_write(e, format!("{} '{}' already exists", self.kind(), name)))?;

        tracing::info!("Created {} {} '{}'", self.kind(), item.id, item.name);
        Ok(item)
    }

    pub async fn get(&self, id: i64) -> ServiceResult<CatalogItem> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get catalog item")?
            .ok_or_else(|| ServiceError::not_found(&self.kind().to_string(), id))
    }

    pub async fn update(&self, id: i64, input: UpdateCatalogInput) -> ServiceResult<CatalogItem> {
        if input.name.is_none() && input.image.is_none() {
            return Err(ServiceError::Validation(
                "At least one field must be provided".to_string(),
            ));
        }

        let mut item = self.get(id).await?;
        let previous_image = item.image.clone();
        if let Some(name) = input.name {
            item.name = check_length("name", &name, 3, 100)?;
        }
        if let Some(image) = input.image {
            item.image = image;
        }

        let updated = self
            .repo
            .update(&item)
            .await
            .map_err(|e| ServiceError::from_write(e, format!("{} '{}' already exists", self.kind(), item.name)))?;

        if updated.image != previous_image {
            self.files.remove(&previous_image).await;
        }
        Ok(updated)
    }

    /// Delete an item; its center and branch links go with it
    pub async fn delete(&self, id: i64) -> ServiceResult<()> {
        let item = self.get(id).await?;

        self.repo
            .delete(id)
            .await
            .map_err(|e| ServiceError::from_write(e, format!("{} is still in use", self.kind())))?;

        self.files.remove(&item.image).await;
        Ok(())
    }

    pub async fn list(&self, params: &ListParams<CatalogSort>) -> ServiceResult<PagedResult<CatalogItem>> {
        let (items, total) = self.repo.list(params).await.context("Failed to list catalog items")?;
        Ok(PagedResult::new(items, total, params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UploadConfig;
    use crate::db::repositories::test_support::migrated_pool;
    use crate::db::repositories::SqlxCatalogRepository;
    use tempfile::TempDir;

    async fn setup(kind: CatalogKind) -> (TempDir, Arc<FileStore>, CatalogService) {
        let dir = TempDir::new().unwrap();
        let files = Arc::new(FileStore::new(UploadConfig {
            path: dir.path().to_path_buf(),
            ..UploadConfig::default()
        }));
        let pool = migrated_pool().await;
        let service = CatalogService::new(SqlxCatalogRepository::boxed(pool, kind), files.clone());
        (dir, files, service)
    }

    #[tokio::test]
    async fn test_subject_name_rules() {
        let (_dir, _files, service) = setup(CatalogKind::Subject).await;

        assert!(matches!(service.create("AB", "/uploads/x.png").await, Err(ServiceError::Validation(_))));
        service.create("Math", "/uploads/subjects/a.png").await.unwrap();
        assert!(matches!(
            service.create("Math", "/uploads/subjects/b.png").await,
            Err(ServiceError::Conflict(msg)) if msg == "Subject 'Math' already exists"
        ));
    }

    #[tokio::test]
    async fn test_replacing_image_removes_old_file() {
        let (dir, files, service) = setup(CatalogKind::Field).await;
        let old = files.store(Some("fields"), "image/png", b"old").await.unwrap();
        let new = files.store(Some("fields"), "image/png", b"new").await.unwrap();
        let item = service.create("Programming", &old.url).await.unwrap();

        let updated = service
            .update(
                item.id,
                UpdateCatalogInput {
                    name: None,
                    image: Some(new.url.clone()),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.image, new.url);
        assert!(!dir.path().join("fields").join(&old.filename).exists());
        assert!(dir.path().join("fields").join(&new.filename).exists());
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let (_dir, _files, service) = setup(CatalogKind::Field).await;

        assert!(matches!(service.delete(1).await, Err(ServiceError::NotFound(_))));
    }
}
