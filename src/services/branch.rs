//! Branch service
//!
//! Branches belong to an education center and are managed by the center's
//! owner or staff.

use crate::db::repositories::{
    BranchRepository, CatalogRepository, EduCenterRepository, RegionRepository,
};
use crate::models::{
    Branch, BranchDetails, BranchFilter, BranchSort, ListParams, NewBranch, PagedResult,
    UpdateBranchInput, User,
};
use crate::services::error::{check_length, check_phone, ServiceError, ServiceResult};
use anyhow::Context;
use std::sync::Arc;

/// Fields of a new branch supplied by the caller
#[derive(Debug, Clone, Default)]
pub struct CreateBranchInput {
    pub name: String,
    pub image: String,
    pub phone: String,
    pub location: String,
    pub region_id: i64,
    pub edu_center_id: i64,
    pub subject_ids: Vec<i64>,
    pub field_ids: Vec<i64>,
}

pub struct BranchService {
    repo: Arc<dyn BranchRepository>,
    centers: Arc<dyn EduCenterRepository>,
    regions: Arc<dyn RegionRepository>,
    subjects: Arc<dyn CatalogRepository>,
    fields: Arc<dyn CatalogRepository>,
}

impl BranchService {
    pub fn new(
        repo: Arc<dyn BranchRepository>,
        centers: Arc<dyn EduCenterRepository>,
        regions: Arc<dyn RegionRepository>,
        subjects: Arc<dyn CatalogRepository>,
        fields: Arc<dyn CatalogRepository>,
    ) -> Self {
        Self {
            repo,
            centers,
            regions,
            subjects,
            fields,
        }
    }

    pub async fn create(&self, actor: &User, input: CreateBranchInput) -> ServiceResult<BranchDetails> {
        let new = NewBranch {
            name: check_length("name", &input.name, 2, 100)?,
            image: check_length("image", &input.image, 1, 255)?,
            phone: check_phone(&input.phone)?,
            location: check_length("location", &input.location, 2, 255)?,
            region_id: input.region_id,
            edu_center_id: input.edu_center_id,
            subject_ids: input.subject_ids,
            field_ids: input.field_ids,
        };

        let owner = self
            .centers
            .get_by_id(new.edu_center_id)
            .await
            .context("Failed to get education center")?
            .map(|c| c.user_id)
            .ok_or_else(|| {
                ServiceError::Validation(format!("Education center {} does not exist", new.edu_center_id))
            })?;
        ensure_manages(actor, owner)?;
        self.ensure_region(new.region_id).await?;
        self.ensure_catalog(&new.subject_ids, &new.field_ids).await?;

        let branch = self
            .repo
            .create(&new)
            .await
            .map_err(|e| ServiceError::from_write(e, "Branch already exists"))?;

        tracing::info!("Created branch {} of education center {}", branch.id, branch.edu_center_id);
        self.details(branch).await
    }

    pub async fn get(&self, id: i64) -> ServiceResult<Branch> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get branch")?
            .ok_or_else(|| ServiceError::not_found("Branch", id))
    }

    /// A branch with its subjects and fields
    pub async fn get_details(&self, id: i64) -> ServiceResult<BranchDetails> {
        let branch = self.get(id).await?;
        self.details(branch).await
    }

    pub async fn update(&self, actor: &User, id: i64, input: UpdateBranchInput) -> ServiceResult<BranchDetails> {
        if input.name.is_none()
            && input.image.is_none()
            && input.phone.is_none()
            && input.location.is_none()
            && input.region_id.is_none()
            && input.subject_ids.is_none()
            && input.field_ids.is_none()
        {
            return Err(ServiceError::Validation(
                "At least one field must be provided".to_string(),
            ));
        }

        let mut branch = self.get(id).await?;
        self.ensure_branch_owner(actor, &branch).await?;

        if let Some(name) = input.name {
            branch.name = check_length("name", &name, 2, 100)?;
        }
        if let Some(image) = input.image {
            branch.image = check_length("image", &image, 1, 255)?;
        }
        if let Some(phone) = input.phone {
            branch.phone = check_phone(&phone)?;
        }
        if let Some(location) = input.location {
            branch.location = check_length("location", &location, 2, 255)?;
        }
        if let Some(region_id) = input.region_id {
            self.ensure_region(region_id).await?;
            branch.region_id = region_id;
        }

        let subject_ids = input.subject_ids.as_deref();
        let field_ids = input.field_ids.as_deref();
        self.ensure_catalog(subject_ids.unwrap_or_default(), field_ids.unwrap_or_default())
            .await?;

        let updated = self
            .repo
            .update(&branch, subject_ids, field_ids)
            .await
            .map_err(|e| ServiceError::from_write(e, "Branch already exists"))?;

        self.details(updated).await
    }

    pub async fn delete(&self, actor: &User, id: i64) -> ServiceResult<()> {
        let branch = self.get(id).await?;
        self.ensure_branch_owner(actor, &branch).await?;

        self.repo.delete(id).await.context("Failed to delete branch")?;
        Ok(())
    }

    pub async fn list(&self, filter: &BranchFilter, params: &ListParams<BranchSort>) -> ServiceResult<PagedResult<Branch>> {
        let (branches, total) = self
            .repo
            .list(filter, params)
            .await
            .context("Failed to list branches")?;

        Ok(PagedResult::new(branches, total, params))
    }

    async fn details(&self, branch: Branch) -> ServiceResult<BranchDetails> {
        let subjects = self
            .subjects
            .list_by_branch(branch.id)
            .await
            .context("Failed to list branch subjects")?;
        let fields = self
            .fields
            .list_by_branch(branch.id)
            .await
            .context("Failed to list branch fields")?;

        Ok(BranchDetails {
            branch,
            subjects,
            fields,
        })
    }

    async fn ensure_branch_owner(&self, actor: &User, branch: &Branch) -> ServiceResult<()> {
        let owner = self
            .centers
            .get_by_id(branch.edu_center_id)
            .await
            .context("Failed to get education center")?
            .map(|c| c.user_id)
            .ok_or_else(|| ServiceError::not_found("Education center", branch.edu_center_id))?;
        ensure_manages(actor, owner)
    }

    async fn ensure_region(&self, region_id: i64) -> ServiceResult<()> {
        let exists = self
            .regions
            .get_by_id(region_id)
            .await
            .context("Failed to get region")?
            .is_some();
        if !exists {
            return Err(ServiceError::Validation(format!("Region {} does not exist", region_id)));
        }
        Ok(())
    }

    async fn ensure_catalog(&self, subject_ids: &[i64], field_ids: &[i64]) -> ServiceResult<()> {
        for (repo, ids) in [(&self.subjects, subject_ids), (&self.fields, field_ids)] {
            let missing = repo.missing_ids(ids).await.context("Failed to check catalog ids")?;
            if !missing.is_empty() {
                return Err(ServiceError::Validation(format!(
                    "Unknown {} id(s): {:?}",
                    repo.kind().to_string().to_lowercase(),
                    missing
                )));
            }
        }
        Ok(())
    }
}

fn ensure_manages(actor: &User, owner_id: i64) -> ServiceResult<()> {
    if !actor.can_manage(owner_id) {
        return Err(ServiceError::Forbidden(
            "You can only manage branches of your own education centers".to_string(),
        ));
    }
    Ok(())
}
