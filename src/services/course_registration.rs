//! Course registration service
//!
//! A registration names a center, one of its branches, and a subject and a
//! field the center offers. Students see their own registrations, center
//! owners see the ones for their centers, staff see everything.

use crate::db::repositories::{
    BranchRepository, CatalogRepository, CourseRegistrationRepository, EduCenterRepository,
    LinkRepository,
};
use crate::models::{
    CourseRegistration, ListParams, PagedResult, RegistrationFilter, RegistrationSort,
    RegistrationTarget, UpdateRegistrationInput, User,
};
use crate::services::error::{ServiceError, ServiceResult};
use anyhow::Context;
use std::sync::Arc;

/// Repositories used to check a registration target
pub struct RegistrationRefs {
    pub centers: Arc<dyn EduCenterRepository>,
    pub branches: Arc<dyn BranchRepository>,
    pub subjects: Arc<dyn CatalogRepository>,
    pub fields: Arc<dyn CatalogRepository>,
    pub subject_links: Arc<dyn LinkRepository>,
    pub field_links: Arc<dyn LinkRepository>,
}

pub struct CourseRegistrationService {
    repo: Arc<dyn CourseRegistrationRepository>,
    refs: RegistrationRefs,
}

impl CourseRegistrationService {
    pub fn new(repo: Arc<dyn CourseRegistrationRepository>, refs: RegistrationRefs) -> Self {
        Self { repo, refs }
    }

    pub async fn create(&self, student: &User, target: RegistrationTarget) -> ServiceResult<CourseRegistration> {
        self.check_target(&target).await?;

        let registration = self
            .repo
            .create(student.id, &target)
            .await
            .map_err(|e| ServiceError::from_write(e, "Registration already exists"))?;

        tracing::info!(
            "User {} registered at education center {} (registration {})",
            student.id,
            target.edu_center_id,
            registration.id
        );
        Ok(registration)
    }

    /// A registration the actor may see
    pub async fn get(&self, actor: &User, id: i64) -> ServiceResult<CourseRegistration> {
        let registration = self.find(id).await?;
        if !self.can_view(actor, &registration).await? {
            return Err(ServiceError::Forbidden(
                "You cannot view this registration".to_string(),
            ));
        }
        Ok(registration)
    }

    pub async fn update(&self, actor: &User, id: i64, input: UpdateRegistrationInput) -> ServiceResult<CourseRegistration> {
        if input.is_empty() {
            return Err(ServiceError::Validation(
                "At least one field must be provided".to_string(),
            ));
        }

        let registration = self.find(id).await?;
        ensure_owner(actor, &registration)?;

        let target = input.apply_to(registration.target());
        self.check_target(&target).await?;

        self.repo
            .update(id, &target)
            .await
            .map_err(|e| ServiceError::from_write(e, "Registration already exists"))
    }

    pub async fn delete(&self, actor: &User, id: i64) -> ServiceResult<()> {
        let registration = self.find(id).await?;
        ensure_owner(actor, &registration)?;

        self.repo.delete(id).await.context("Failed to delete registration")?;
        Ok(())
    }

    /// List registrations visible to the actor.
    ///
    /// Staff see everything; the owner of the filtered center sees that
    /// center's registrations; everyone else is narrowed to their own.
    pub async fn list(
        &self,
        actor: &User,
        filter: RegistrationFilter,
        params: &ListParams<RegistrationSort>,
    ) -> ServiceResult<PagedResult<CourseRegistration>> {
        let mut filter = filter;
        if !actor.is_staff() && !self.owns_filtered_center(actor, &filter).await? {
            filter.user_id = Some(actor.id);
        }

        let (registrations, total) = self
            .repo
            .list(&filter, params)
            .await
            .context("Failed to list registrations")?;

        Ok(PagedResult::new(registrations, total, params))
    }

    async fn find(&self, id: i64) -> ServiceResult<CourseRegistration> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get registration")?
            .ok_or_else(|| ServiceError::not_found("Registration", id))
    }

    async fn can_view(&self, actor: &User, registration: &CourseRegistration) -> ServiceResult<bool> {
        if actor.can_manage(registration.user_id) {
            return Ok(true);
        }
        let center_owner = self
            .refs
            .centers
            .get_by_id(registration.edu_center_id)
            .await
            .context("Failed to get education center")?
            .map(|c| c.user_id);
        Ok(center_owner == Some(actor.id))
    }

    async fn owns_filtered_center(&self, actor: &User, filter: &RegistrationFilter) -> ServiceResult<bool> {
        let Some(center_id) = filter.edu_center_id else {
            return Ok(false);
        };
        let owner = self
            .refs
            .centers
            .get_by_id(center_id)
            .await
            .context("Failed to get education center")?
            .map(|c| c.user_id);
        Ok(owner == Some(actor.id))
    }

    /// Every reference exists, the branch belongs to the center and the
    /// center offers the subject and the field
    async fn check_target(&self, target: &RegistrationTarget) -> ServiceResult<()> {
        let refs = &self.refs;

        if refs
            .centers
            .get_by_id(target.edu_center_id)
            .await
            .context("Failed to get education center")?
            .is_none()
        {
            return Err(ServiceError::Validation(format!(
                "Education center {} does not exist",
                target.edu_center_id
            )));
        }

        match refs
            .branches
            .get_by_id(target.branch_id)
            .await
            .context("Failed to get branch")?
        {
            None => {
                return Err(ServiceError::Validation(format!(
                    "Branch {} does not exist",
                    target.branch_id
                )))
            }
            Some(branch) if branch.edu_center_id != target.edu_center_id => {
                return Err(ServiceError::Validation(format!(
                    "Branch {} does not belong to education center {}",
                    target.branch_id, target.edu_center_id
                )))
            }
            Some(_) => {}
        }

        let checks = [
            (&refs.subjects, &refs.subject_links, target.subject_id),
            (&refs.fields, &refs.field_links, target.field_id),
        ];
        for (catalog, links, item_id) in checks {
            let kind = catalog.kind();
            if catalog
                .get_by_id(item_id)
                .await
                .context("Failed to get catalog item")?
                .is_none()
            {
                return Err(ServiceError::Validation(format!("{} {} does not exist", kind, item_id)));
            }
            if !links
                .exists(target.edu_center_id, item_id)
                .await
                .context("Failed to check center link")?
            {
                return Err(ServiceError::Validation(format!(
                    "Education center {} does not offer {} {}",
                    target.edu_center_id,
                    kind.to_string().to_lowercase(),
                    item_id
                )));
            }
        }

        Ok(())
    }
}

fn ensure_owner(actor: &User, registration: &CourseRegistration) -> ServiceResult<()> {
    if !actor.can_manage(registration.user_id) {
        return Err(ServiceError::Forbidden(
            "You can only manage your own registrations".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{
        insert_branch, insert_catalog_item, insert_center, insert_region, insert_user_model,
        link_center, migrated_pool,
    };
    use crate::db::repositories::{
        SqlxBranchRepository, SqlxCatalogRepository, SqlxCourseRegistrationRepository,
        SqlxEduCenterRepository, SqlxLinkRepository,
    };
    use crate::db::DynDatabasePool;
    use crate::models::CatalogKind;

    struct Harness {
        pool: DynDatabasePool,
        service: CourseRegistrationService,
        owner: User,
        target: RegistrationTarget,
    }

    async fn setup() -> Harness {
        let pool = migrated_pool().await;
        let region = insert_region(&pool, "Tashkent").await;
        let owner = insert_user_model(&pool, 1, "ceo").await;
        let center = insert_center(&pool, "Star", region, owner.id).await;
        let branch = insert_branch(&pool, "Main", region, center).await;
        let math = insert_catalog_item(&pool, "subjects", "Math").await;
        let it = insert_catalog_item(&pool, "fields", "IT").await;
        link_center(&pool, "edu_subjects", "subject_id", center, math).await;
        link_center(&pool, "edu_fields", "field_id", center, it).await;

        let refs = RegistrationRefs {
            centers: SqlxEduCenterRepository::boxed(pool.clone()),
            branches: SqlxBranchRepository::boxed(pool.clone()),
            subjects: SqlxCatalogRepository::boxed(pool.clone(), CatalogKind::Subject),
            fields: SqlxCatalogRepository::boxed(pool.clone(), CatalogKind::Field),
            subject_links: SqlxLinkRepository::boxed(pool.clone(), CatalogKind::Subject),
            field_links: SqlxLinkRepository::boxed(pool.clone(), CatalogKind::Field),
        };
        let service = CourseRegistrationService::new(SqlxCourseRegistrationRepository::boxed(pool.clone()), refs);

        Harness {
            pool,
            service,
            owner,
            target: RegistrationTarget {
                edu_center_id: center,
                branch_id: branch,
                subject_id: math,
                field_id: it,
            },
        }
    }

    #[tokio::test]
    async fn test_register_for_offered_course() {
        let h = setup().await;
        let student = insert_user_model(&h.pool, 2, "user").await;

        let registration = h.service.create(&student, h.target).await.unwrap();

        assert_eq!(registration.user_id, student.id);
        assert_eq!(registration.subject_name, "Math");
        assert_eq!(registration.branch_name, "Main");
    }

    #[tokio::test]
    async fn test_target_rules() {
        let h = setup().await;
        let student = insert_user_model(&h.pool, 2, "user").await;
        let region = insert_region(&h.pool, "Andijan").await;
        let other_center = insert_center(&h.pool, "Other", region, h.owner.id).await;
        let foreign_branch = insert_branch(&h.pool, "Far", region, other_center).await;
        let physics = insert_catalog_item(&h.pool, "subjects", "Physics").await;

        let cases = [
            RegistrationTarget {
                branch_id: foreign_branch,
                ..h.target
            },
            RegistrationTarget {
                subject_id: physics,
                ..h.target
            },
            RegistrationTarget {
                field_id: 999,
                ..h.target
            },
            RegistrationTarget {
                edu_center_id: 999,
                ..h.target
            },
        ];
        for target in cases {
            assert!(matches!(
                h.service.create(&student, target).await,
                Err(ServiceError::Validation(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_visibility() {
        let h = setup().await;
        let alice = insert_user_model(&h.pool, 2, "user").await;
        let bob = insert_user_model(&h.pool, 3, "user").await;
        let staff = insert_user_model(&h.pool, 4, "admin").await;
        let registration = h.service.create(&alice, h.target).await.unwrap();
        h.service.create(&bob, h.target).await.unwrap();

        assert!(matches!(
            h.service.get(&bob, registration.id).await,
            Err(ServiceError::Forbidden(_))
        ));
        h.service.get(&h.owner, registration.id).await.unwrap();

        let own = h
            .service
            .list(&alice, RegistrationFilter::default(), &ListParams::default())
            .await
            .unwrap();
        assert_eq!(own.total, 1);

        let center_view = h
            .service
            .list(
                &h.owner,
                RegistrationFilter {
                    edu_center_id: Some(h.target.edu_center_id),
                    ..Default::default()
                },
                &ListParams::default(),
            )
            .await
            .unwrap();
        assert_eq!(center_view.total, 2);

        let everything = h
            .service
            .list(&staff, RegistrationFilter::default(), &ListParams::default())
            .await
            .unwrap();
        assert_eq!(everything.total, 2);
    }

    #[tokio::test]
    async fn test_update_and_delete_by_owner_only() {
        let h = setup().await;
        let alice = insert_user_model(&h.pool, 2, "user").await;
        let bob = insert_user_model(&h.pool, 3, "user").await;
        let second_branch = insert_branch(&h.pool, "Second", 1, h.target.edu_center_id).await;
        let registration = h.service.create(&alice, h.target).await.unwrap();

        let move_branch = UpdateRegistrationInput {
            branch_id: Some(second_branch),
            ..Default::default()
        };
        assert!(matches!(
            h.service.update(&bob, registration.id, move_branch.clone()).await,
            Err(ServiceError::Forbidden(_))
        ));
        let moved = h.service.update(&alice, registration.id, move_branch).await.unwrap();
        assert_eq!(moved.branch_name, "Second");

        assert!(matches!(
            h.service.update(&alice, registration.id, UpdateRegistrationInput::default()).await,
            Err(ServiceError::Validation(_))
        ));

        h.service.delete(&alice, registration.id).await.unwrap();
        assert!(matches!(
            h.service.get(&alice, registration.id).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
