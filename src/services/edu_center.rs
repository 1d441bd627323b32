//! Education center service
//!
//! Centers belong to a ceo (or are assigned to one by staff). The details
//! view bundles the center with its subjects, fields, branches and review
//! aggregates.

use crate::db::repositories::{
    BranchRepository, CatalogRepository, EduCenterRepository, RegionRepository, UserRepository,
};
use crate::models::{
    CatalogKind, EduCenter, EduCenterDetails, EduCenterFilter, EduCenterSort, ListParams, NewEduCenter,
    PagedResult, UpdateEduCenterInput, User,
};
use crate::services::error::{check_length, check_phone, ServiceError, ServiceResult};
use anyhow::Context;
use std::sync::Arc;

/// Fields of a new center supplied by the caller
#[derive(Debug, Clone, Default)]
pub struct CreateEduCenterInput {
    pub name: String,
    pub image: String,
    pub phone: String,
    pub license: String,
    pub address: Option<String>,
    pub region_id: i64,
    /// Owner; only staff may name someone other than themself
    pub user_id: Option<i64>,
    pub subject_ids: Vec<i64>,
    pub field_ids: Vec<i64>,
}

pub struct EduCenterService {
    repo: Arc<dyn EduCenterRepository>,
    regions: Arc<dyn RegionRepository>,
    users: Arc<dyn UserRepository>,
    subjects: Arc<dyn CatalogRepository>,
    fields: Arc<dyn CatalogRepository>,
    branches: Arc<dyn BranchRepository>,
}

impl EduCenterService {
    pub fn new(
        repo: Arc<dyn EduCenterRepository>,
        regions: Arc<dyn RegionRepository>,
        users: Arc<dyn UserRepository>,
        subjects: Arc<dyn CatalogRepository>,
        fields: Arc<dyn CatalogRepository>,
        branches: Arc<dyn BranchRepository>,
    ) -> Self {
        Self {
            repo,
            regions,
            users,
            subjects,
            fields,
            branches,
        }
    }

    pub async fn create(&self, actor: &User, input: CreateEduCenterInput) -> ServiceResult<EduCenterDetails> {
        if !(actor.is_ceo() || actor.is_staff()) {
            return Err(ServiceError::Forbidden(
                "Only a ceo or staff can create education centers".to_string(),
            ));
        }

        let user_id = match input.user_id {
            Some(owner) if owner != actor.id => {
                if !actor.is_staff() {
                    return Err(ServiceError::Forbidden(
                        "Only staff can assign a center to another user".to_string(),
                    ));
                }
                self.ensure_user(owner).await?;
                owner
            }
            _ => actor.id,
        };

        let new = NewEduCenter {
            name: check_length("name", &input.name, 2, 100)?,
            image: check_length("image", &input.image, 1, 255)?,
            phone: check_phone(&input.phone)?,
            license: check_length("license", &input.license, 1, 255)?,
            address: normalize_address(input.address),
            region_id: input.region_id,
            user_id,
            subject_ids: input.subject_ids,
            field_ids: input.field_ids,
        };
        self.ensure_region(new.region_id).await?;
        self.ensure_catalog(&new.subject_ids, &new.field_ids).await?;

        let center = self
            .repo
            .create(&new)
            .await
            .map_err(|e| ServiceError::from_write(e, "Education center already exists"))?;

        tracing::info!("User {} created education center {} for user {}", actor.id, center.id, user_id);
        self.details(center).await
    }

    pub async fn get(&self, id: i64) -> ServiceResult<EduCenter> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get education center")?
            .ok_or_else(|| ServiceError::not_found("Education center", id))
    }

    /// A center with subjects, fields, branches and review aggregates
    pub async fn get_details(&self, id: i64) -> ServiceResult<EduCenterDetails> {
        let center = self.get(id).await?;
        self.details(center).await
    }

    pub async fn update(&self, actor: &User, id: i64, input: UpdateEduCenterInput) -> ServiceResult<EduCenterDetails> {
        if is_empty(&input) {
            return Err(ServiceError::Validation(
                "At least one field must be provided".to_string(),
            ));
        }

        let mut center = self.get(id).await?;
        ensure_owner(actor, &center)?;

        if let Some(name) = input.name {
            center.name = check_length("name", &name, 2, 100)?;
        }
        if let Some(image) = input.image {
            center.image = check_length("image", &image, 1, 255)?;
        }
        if let Some(phone) = input.phone {
            center.phone = check_phone(&phone)?;
        }
        if let Some(license) = input.license {
            center.license = check_length("license", &license, 1, 255)?;
        }
        if input.address.is_some() {
            center.address = normalize_address(input.address);
        }
        if let Some(region_id) = input.region_id {
            self.ensure_region(region_id).await?;
            center.region_id = region_id;
        }
        if let Some(user_id) = input.user_id {
            if user_id != center.user_id {
                if !actor.is_staff() {
                    return Err(ServiceError::Forbidden(
                        "Only staff can reassign a center".to_string(),
                    ));
                }
                self.ensure_user(user_id).await?;
                center.user_id = user_id;
            }
        }

        let subject_ids = input.subject_ids.as_deref();
        let field_ids = input.field_ids.as_deref();
        self.ensure_catalog(subject_ids.unwrap_or_default(), field_ids.unwrap_or_default())
            .await?;
        for (kind, ids) in [(CatalogKind::Subject, subject_ids), (CatalogKind::Field, field_ids)] {
            if let Some(ids) = ids {
                ensure_not_registered(self.repo.as_ref(), id, kind, |item| !ids.contains(&item)).await?;
            }
        }

        let updated = self
            .repo
            .update(&center, subject_ids, field_ids)
            .await
            .map_err(|e| ServiceError::from_write(e, "Education center already exists"))?;

        self.details(updated).await
    }

    /// Delete a center with everything hanging off it
    pub async fn delete(&self, actor: &User, id: i64) -> ServiceResult<()> {
        let center = self.get(id).await?;
        ensure_owner(actor, &center)?;

        self.repo
            .delete(id)
            .await
            .context("Failed to delete education center")?;

        tracing::info!("User {} deleted education center {}", actor.id, id);
        Ok(())
    }

    pub async fn list(
        &self,
        filter: &EduCenterFilter,
        params: &ListParams<EduCenterSort>,
    ) -> ServiceResult<PagedResult<EduCenter>> {
        let (centers, total) = self
            .repo
            .list(filter, params)
            .await
            .context("Failed to list education centers")?;

        Ok(PagedResult::new(centers, total, params))
    }

    async fn details(&self, center: EduCenter) -> ServiceResult<EduCenterDetails> {
        let subjects = self
            .subjects
            .list_by_center(center.id)
            .await
            .context("Failed to list center subjects")?;
        let fields = self
            .fields
            .list_by_center(center.id)
            .await
            .context("Failed to list center fields")?;
        let branches = self
            .branches
            .list_by_center(center.id)
            .await
            .context("Failed to list center branches")?;
        let stats = self
            .repo
            .stats(center.id)
            .await
            .context("Failed to load center stats")?;

        Ok(EduCenterDetails {
            center,
            region_name: stats.region_name,
            owner_name: stats.owner_name,
            subjects,
            fields,
            branches,
            rating: stats.rating,
            comment_count: stats.comment_count,
            like_count: stats.like_count,
        })
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

    async fn ensure_user(&self, user_id: i64) -> ServiceResult<()> {
        let exists = self
            .users
            .get_by_id(user_id)
            .await
            .context("Failed to get user")?
            .is_some();
        if !exists {
            return Err(ServiceError::Validation(format!("User {} does not exist", user_id)));
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

/// Refuse to unlink subjects or fields that course registrations at the
/// center still point at. `removed` selects the ids being unlinked.
pub(crate) async fn ensure_not_registered(
    centers: &dyn EduCenterRepository,
    center_id: i64,
    kind: CatalogKind,
    removed: impl Fn(i64) -> bool,
) -> ServiceResult<()> {
    let in_use: Vec<i64> = centers
        .registered_catalog_ids(center_id, kind)
        .await
        .context("Failed to check course registrations")?
        .into_iter()
        .filter(|id| removed(*id))
        .collect();

    if !in_use.is_empty() {
        return Err(ServiceError::Conflict(format!(
            "{} id(s) {:?} still have course registrations at this center",
            kind, in_use
        )));
    }
    Ok(())
}

fn ensure_owner(actor: &User, center: &EduCenter) -> ServiceResult<()> {
    if !actor.can_manage(center.user_id) {
        return Err(ServiceError::Forbidden(
            "You can only manage your own education centers".to_string(),
        ));
    }
    Ok(())
}

fn normalize_address(address: Option<String>) -> Option<String> {
    address.map(|a| a.trim().to_string()).filter(|a| !a.is_empty())
}

fn is_empty(input: &UpdateEduCenterInput) -> bool {
    input.name.is_none()
        && input.image.is_none()
        && input.phone.is_none()
        && input.license.is_none()
        && input.address.is_none()
        && input.region_id.is_none()
        && input.user_id.is_none()
        && input.subject_ids.is_none()
        && input.field_ids.is_none()
}
