// Examinations and their documents. Writes that reference a practitioner,
// facility or individual are gated by the sibling checks, always in the
// same order and always before anything is stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::database::models::{
    Attachment, Examination, ImageAsset, ImageSeries, NewAttachment, NewExamination, NewImageAsset, NewImageSeries,
};
use crate::database::{Lookup, Repository, StoreError};
use crate::error::ApiError;
use crate::services::passcode::{self, MAX_PASSCODE_ATTEMPTS};
use crate::siblings::AssociationChecks;
use crate::types::Scope;
use crate::validation::{FieldErrors, Validate};

const PASSCODE_CONSTRAINT: &str = "examinations_active_passcode";

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ExaminationRequest {
    pub practitioner_id: i64,
    pub individual_id: i64,
    pub facility_id: i64,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ExaminationPatch {
    pub practitioner_id: Option<i64>,
    pub individual_id: Option<i64>,
    pub facility_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SeriesRequest {
    pub name: String,
}

impl Validate for SeriesRequest {
    fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        errors.not_blank("name", &self.name);
        errors.finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AssetRequest {
    pub url: String,
}

impl Validate for AssetRequest {
    fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        errors.not_blank("url", &self.url);
        errors.finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AttachmentRequest {
    pub name: String,
    pub url: String,
}

impl Validate for AttachmentRequest {
    fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        errors.not_blank("name", &self.name).not_blank("url", &self.url);
        errors.finish()
    }
}

/// Read-only composition of an examination with its active documents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExaminationView {
    pub id: Uuid,
    pub practitioner_id: i64,
    pub individual_id: i64,
    pub facility_id: i64,
    pub passcode: String,
    pub created_at: DateTime<Utc>,
    pub series: Vec<SeriesView>,
    pub attachments: Vec<AttachmentView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesView {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub assets: Vec<AssetView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetView {
    pub id: Uuid,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentView {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

impl From<ImageAsset> for AssetView {
    fn from(asset: ImageAsset) -> Self {
        Self {
            id: asset.id,
            url: asset.url,
            created_at: asset.created_at,
        }
    }
}

impl From<Attachment> for AttachmentView {
    fn from(attachment: Attachment) -> Self {
        Self {
            id: attachment.id,
            name: attachment.name,
            url: attachment.url,
            created_at: attachment.created_at,
        }
    }
}

/// Repositories for the four examination collections
#[derive(Clone)]
pub struct ExaminationStores {
    pub examinations: Arc<dyn Repository<Examination>>,
    pub series: Arc<dyn Repository<ImageSeries>>,
    pub assets: Arc<dyn Repository<ImageAsset>>,
    pub attachments: Arc<dyn Repository<Attachment>>,
}

pub struct ExaminationService {
    stores: ExaminationStores,
    checks: Arc<dyn AssociationChecks>,
}

impl ExaminationService {
    pub fn new(stores: ExaminationStores, checks: Arc<dyn AssociationChecks>) -> Self {
        Self { stores, checks }
    }

    async fn require_association(&self, practitioner_id: i64, facility_id: i64) -> Result<(), ApiError> {
        if !self.checks.check_association(practitioner_id, facility_id).await? {
            return Err(ApiError::not_found(format!(
                "No active association found with Doctor Id: {} and Hospital Id: {}",
                practitioner_id, facility_id
            )));
        }
        Ok(())
    }

    async fn require_individual(&self, individual_id: i64) -> Result<(), ApiError> {
        if !self.checks.check_individual_exists(individual_id).await? {
            return Err(ApiError::not_found(format!(
                "No active patient found with Patient Id: {}",
                individual_id
            )));
        }
        Ok(())
    }

    /// Creates an examination with a fresh passcode once both checks pass
    pub async fn create(&self, request: ExaminationRequest) -> Result<Examination, ApiError> {
        self.require_association(request.practitioner_id, request.facility_id).await?;
        self.require_individual(request.individual_id).await?;

        for attempt in 1..=MAX_PASSCODE_ATTEMPTS {
            let draft = NewExamination {
                practitioner_id: request.practitioner_id,
                individual_id: request.individual_id,
                facility_id: request.facility_id,
                passcode: passcode::generate(),
            };
            match self.stores.examinations.insert(draft).await {
                Ok(examination) => {
                    info!("Created examination {} for patient {}", examination.id, examination.individual_id);
                    return Ok(examination);
                }
                Err(StoreError::Duplicate { constraint, .. }) if constraint == PASSCODE_CONSTRAINT => {
                    warn!("Passcode collision on attempt {}, regenerating", attempt);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(ApiError::unexpected("Could not allocate a unique passcode"))
    }

    pub async fn get(&self, id: Uuid) -> Result<Examination, ApiError> {
        Ok(self.stores.examinations.get_404(&id).await?)
    }

    /// Full replace: both checks run regardless of what changed
    pub async fn replace(&self, id: Uuid, request: ExaminationRequest) -> Result<Examination, ApiError> {
        let mut examination = self.stores.examinations.get_404(&id).await?;
        self.require_association(request.practitioner_id, request.facility_id).await?;
        self.require_individual(request.individual_id).await?;

        examination.practitioner_id = request.practitioner_id;
        examination.individual_id = request.individual_id;
        examination.facility_id = request.facility_id;
        self.store(examination).await
    }

    /// Partial update: only references that actually change are re-checked
    pub async fn patch(&self, id: Uuid, patch: ExaminationPatch) -> Result<Examination, ApiError> {
        let mut examination = self.stores.examinations.get_404(&id).await?;

        let practitioner_id = patch.practitioner_id.filter(|v| *v != examination.practitioner_id);
        let facility_id = patch.facility_id.filter(|v| *v != examination.facility_id);
        let individual_id = patch.individual_id.filter(|v| *v != examination.individual_id);

        if practitioner_id.is_some() || facility_id.is_some() {
            self.require_association(
                practitioner_id.unwrap_or(examination.practitioner_id),
                facility_id.unwrap_or(examination.facility_id),
            )
            .await?;
        }
        if let Some(individual_id) = individual_id {
            self.require_individual(individual_id).await?;
        }

        if practitioner_id.is_none() && facility_id.is_none() && individual_id.is_none() {
            return Ok(examination);
        }
        if let Some(v) = practitioner_id {
            examination.practitioner_id = v;
        }
        if let Some(v) = facility_id {
            examination.facility_id = v;
        }
        if let Some(v) = individual_id {
            examination.individual_id = v;
        }
        self.store(examination).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ApiError> {
        if !self.stores.examinations.soft_delete(&id, Utc::now()).await? {
            return Err(no_examination(id));
        }
        Ok(())
    }

    async fn store(&self, examination: Examination) -> Result<Examination, ApiError> {
        if !self.stores.examinations.update(&examination).await? {
            return Err(no_examination(examination.id));
        }
        Ok(examination)
    }

    pub async fn add_series(&self, examination_id: Uuid, request: SeriesRequest) -> Result<ImageSeries, ApiError> {
        request.validate()?;
        self.stores.examinations.get_404(&examination_id).await?;
        let draft = NewImageSeries {
            examination_id,
            name: request.name,
        };
        Ok(self.stores.series.insert(draft).await?)
    }

    pub async fn delete_series(&self, examination_id: Uuid, series_id: Uuid) -> Result<(), ApiError> {
        self.series_of(examination_id, series_id).await?;
        if !self.stores.series.soft_delete(&series_id, Utc::now()).await? {
            return Err(no_series(series_id));
        }
        Ok(())
    }

    pub async fn add_asset(
        &self,
        examination_id: Uuid,
        series_id: Uuid,
        request: AssetRequest,
    ) -> Result<ImageAsset, ApiError> {
        request.validate()?;
        self.series_of(examination_id, series_id).await?;
        let draft = NewImageAsset {
            series_id,
            url: request.url,
        };
        Ok(self.stores.assets.insert(draft).await?)
    }

    pub async fn delete_asset(&self, examination_id: Uuid, series_id: Uuid, asset_id: Uuid) -> Result<(), ApiError> {
        self.series_of(examination_id, series_id).await?;
        let asset = self
            .stores
            .assets
            .get(&asset_id, Scope::Active)
            .await?
            .filter(|asset| asset.series_id == series_id)
            .ok_or_else(|| ApiError::not_found(format!("No active image asset found with Id: {}", asset_id)))?;

        if !self.stores.assets.soft_delete(&asset.id, Utc::now()).await? {
            return Err(ApiError::not_found(format!("No active image asset found with Id: {}", asset_id)));
        }
        Ok(())
    }

    pub async fn add_attachment(
        &self,
        examination_id: Uuid,
        request: AttachmentRequest,
    ) -> Result<Attachment, ApiError> {
        request.validate()?;
        self.stores.examinations.get_404(&examination_id).await?;
        let draft = NewAttachment {
            examination_id,
            name: request.name,
            url: request.url,
        };
        Ok(self.stores.attachments.insert(draft).await?)
    }

    pub async fn delete_attachment(&self, examination_id: Uuid, attachment_id: Uuid) -> Result<(), ApiError> {
        self.stores.examinations.get_404(&examination_id).await?;
        let attachment = self
            .stores
            .attachments
            .get(&attachment_id, Scope::Active)
            .await?
            .filter(|a| a.examination_id == examination_id)
            .ok_or_else(|| no_attachment(attachment_id))?;

        if !self.stores.attachments.soft_delete(&attachment.id, Utc::now()).await? {
            return Err(no_attachment(attachment_id));
        }
        Ok(())
    }

    /// Active series belonging to an active examination
    async fn series_of(&self, examination_id: Uuid, series_id: Uuid) -> Result<ImageSeries, ApiError> {
        self.stores.examinations.get_404(&examination_id).await?;
        self.stores
            .series
            .get(&series_id, Scope::Active)
            .await?
            .filter(|series| series.examination_id == examination_id)
            .ok_or_else(|| no_series(series_id))
    }

    /// Public lookup. The passcode format is checked before any store access.
    pub async fn view_by_passcode(&self, code: &str) -> Result<ExaminationView, ApiError> {
        passcode::validate(code)?;
        let examination = self
            .stores
            .examinations
            .find_one(&[Lookup::eq("passcode", code)], Scope::Active)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("No active examination found with Passcode: {}", code)))?;
        self.compose(examination).await
    }

    pub async fn view(&self, id: Uuid) -> Result<ExaminationView, ApiError> {
        let examination = self.stores.examinations.get_404(&id).await?;
        self.compose(examination).await
    }

    async fn compose(&self, examination: Examination) -> Result<ExaminationView, ApiError> {
        let by_examination = [Lookup::eq("examination_id", examination.id)];

        let mut series = Vec::new();
        for s in self.stores.series.find(&by_examination, Scope::Active).await? {
            let assets = self
                .stores
                .assets
                .find(&[Lookup::eq("series_id", s.id)], Scope::Active)
                .await?;
            series.push(SeriesView {
                id: s.id,
                name: s.name,
                created_at: s.created_at,
                assets: assets.into_iter().map(AssetView::from).collect(),
            });
        }

        let attachments = self
            .stores
            .attachments
            .find(&by_examination, Scope::Active)
            .await?
            .into_iter()
            .map(AttachmentView::from)
            .collect();

        Ok(ExaminationView {
            id: examination.id,
            practitioner_id: examination.practitioner_id,
            individual_id: examination.individual_id,
            facility_id: examination.facility_id,
            passcode: examination.passcode,
            created_at: examination.created_at,
            series,
            attachments,
        })
    }
}

fn no_examination(id: Uuid) -> ApiError {
    ApiError::not_found(format!("No active examination found with Id: {}", id))
}

fn no_series(id: Uuid) -> ApiError {
    ApiError::not_found(format!("No active image series found with Id: {}", id))
}

fn no_attachment(id: Uuid) -> ApiError {
    ApiError::not_found(format!("No active attachment found with Id: {}", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryRepository;
    use crate::siblings::SiblingError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Doctor 1 works at hospital 10, doctor 2 at hospital 20; patient 100 exists
    #[derive(Default)]
    struct Fixed {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AssociationChecks for Fixed {
        async fn check_association(&self, practitioner_id: i64, facility_id: i64) -> Result<bool, SiblingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(matches!((practitioner_id, facility_id), (1, 10) | (2, 20) | (2, 10)))
        }

        async fn check_individual_exists(&self, individual_id: i64) -> Result<bool, SiblingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(individual_id == 100 || individual_id == 101)
        }
    }

    struct Harness {
        service: ExaminationService,
        examinations: Arc<MemoryRepository<Examination>>,
        series: Arc<MemoryRepository<ImageSeries>>,
        checks: Arc<Fixed>,
    }

    fn harness() -> Harness {
        let examinations = Arc::new(MemoryRepository::<Examination>::new());
        let series = Arc::new(MemoryRepository::<ImageSeries>::new());
        let checks = Arc::new(Fixed::default());
        let stores = ExaminationStores {
            examinations: examinations.clone(),
            series: series.clone(),
            assets: Arc::new(MemoryRepository::<ImageAsset>::new()),
            attachments: Arc::new(MemoryRepository::<Attachment>::new()),
        };
        Harness {
            service: ExaminationService::new(stores, checks.clone()),
            examinations,
            series,
            checks,
        }
    }

    fn request(practitioner_id: i64, facility_id: i64, individual_id: i64) -> ExaminationRequest {
        ExaminationRequest {
            practitioner_id,
            individual_id,
            facility_id,
        }
    }

    #[tokio::test]
    async fn creates_with_a_fresh_passcode() {
        let h = harness();
        let first = h.service.create(request(1, 10, 100)).await.unwrap();
        let second = h.service.create(request(1, 10, 100)).await.unwrap();
        assert!(passcode::is_valid(&first.passcode));
        assert_ne!(first.passcode, second.passcode);
    }

    #[tokio::test]
    async fn missing_association_persists_nothing() {
        let h = harness();
        let err = h.service.create(request(1, 20, 100)).await.unwrap_err();
        assert_eq!(
            err.message(),
            "No active association found with Doctor Id: 1 and Hospital Id: 20"
        );
        assert!(h.examinations.is_empty().await);
        // The individual check never ran
        assert_eq!(h.checks.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_individual_is_not_found() {
        let h = harness();
        let err = h.service.create(request(1, 10, 999)).await.unwrap_err();
        assert_eq!(err.message(), "No active patient found with Patient Id: 999");
        assert!(h.examinations.is_empty().await);
    }

    #[tokio::test]
    async fn patch_rechecks_only_changed_references() {
        let h = harness();
        let exam = h.service.create(request(1, 10, 100)).await.unwrap();
        let before = h.checks.calls.load(Ordering::SeqCst);

        // Same values as stored: no checks at all
        let same = ExaminationPatch {
            practitioner_id: Some(1),
            ..Default::default()
        };
        h.service.patch(exam.id, same).await.unwrap();
        assert_eq!(h.checks.calls.load(Ordering::SeqCst), before);

        // New practitioner pairs with the stored facility
        let moved = ExaminationPatch {
            practitioner_id: Some(2),
            ..Default::default()
        };
        let updated = h.service.patch(exam.id, moved).await.unwrap();
        assert_eq!((updated.practitioner_id, updated.facility_id), (2, 10));
        assert_eq!(h.checks.calls.load(Ordering::SeqCst), before + 1);

        let bad_patient = ExaminationPatch {
            individual_id: Some(555),
            ..Default::default()
        };
        assert_eq!(h.service.patch(exam.id, bad_patient).await.unwrap_err().status_code(), 404);
        assert_eq!(h.service.get(exam.id).await.unwrap().individual_id, 100);
    }

    #[tokio::test]
    async fn replace_runs_both_checks() {
        let h = harness();
        let exam = h.service.create(request(1, 10, 100)).await.unwrap();
        let before = h.checks.calls.load(Ordering::SeqCst);

        let updated = h.service.replace(exam.id, request(1, 10, 101)).await.unwrap();
        assert_eq!(updated.individual_id, 101);
        assert_eq!(updated.passcode, exam.passcode);
        assert_eq!(h.checks.calls.load(Ordering::SeqCst), before + 2);
    }

    #[tokio::test]
    async fn malformed_passcode_touches_no_store() {
        let h = harness();
        for code in ["", "ABC", "ABCDEFGHIJK", "ABCDE FGHI"] {
            let err = h.service.view_by_passcode(code).await.unwrap_err();
            assert_eq!(err.status_code(), 400);
        }
        assert_eq!(h.examinations.calls(), 0);
        assert_eq!(h.series.calls(), 0);
    }

    #[tokio::test]
    async fn view_nests_assets_under_series_in_creation_order() {
        let h = harness();
        let exam = h.service.create(request(1, 10, 100)).await.unwrap();

        let s1 = h
            .service
            .add_series(exam.id, SeriesRequest { name: "S1".to_string() })
            .await
            .unwrap();
        let s2 = h
            .service
            .add_series(exam.id, SeriesRequest { name: "S2".to_string() })
            .await
            .unwrap();
        for url in ["A1", "A2"] {
            h.service
                .add_asset(exam.id, s1.id, AssetRequest { url: url.to_string() })
                .await
                .unwrap();
        }
        h.service
            .add_attachment(
                exam.id,
                AttachmentRequest {
                    name: "F1".to_string(),
                    url: "https://files.example/f1".to_string(),
                },
            )
            .await
            .unwrap();
        h.service.delete_series(exam.id, s2.id).await.unwrap();

        let view = h.service.view_by_passcode(&exam.passcode).await.unwrap();
        assert_eq!(view.id, exam.id);
        assert_eq!(view.series.len(), 1);
        assert_eq!(view.series[0].name, "S1");
        let urls: Vec<&str> = view.series[0].assets.iter().map(|a| a.url.as_str()).collect();
        assert_eq!(urls, vec!["A1", "A2"]);
        assert_eq!(view.attachments.len(), 1);
        assert_eq!(view.attachments[0].name, "F1");

        assert_eq!(h.service.view(exam.id).await.unwrap(), view);
    }

    #[tokio::test]
    async fn known_passcode_composes_one_of_each() {
        let h = harness();
        let exam = h
            .examinations
            .insert(NewExamination {
                practitioner_id: 1,
                individual_id: 100,
                facility_id: 10,
                passcode: "ABCDEFGHIJ".to_string(),
            })
            .await
            .unwrap();
        let series = h
            .service
            .add_series(exam.id, SeriesRequest { name: "S1".to_string() })
            .await
            .unwrap();
        h.service
            .add_asset(exam.id, series.id, AssetRequest { url: "A1".to_string() })
            .await
            .unwrap();
        h.service
            .add_attachment(
                exam.id,
                AttachmentRequest {
                    name: "F1".to_string(),
                    url: "F1".to_string(),
                },
            )
            .await
            .unwrap();

        let view = h.service.view_by_passcode("ABCDEFGHIJ").await.unwrap();
        assert_eq!(view.series.len(), 1);
        assert_eq!(view.series[0].assets.len(), 1);
        assert_eq!(view.series[0].assets[0].url, "A1");
        assert_eq!(view.attachments.len(), 1);
        assert_eq!(view.attachments[0].name, "F1");
    }

    #[tokio::test]
    async fn deleted_examination_is_gone_from_every_lookup() {
        let h = harness();
        let exam = h.service.create(request(1, 10, 100)).await.unwrap();
        h.service.delete(exam.id).await.unwrap();

        assert_eq!(h.service.delete(exam.id).await.unwrap_err().status_code(), 404);
        assert_eq!(h.service.view_by_passcode(&exam.passcode).await.unwrap_err().status_code(), 404);
        let err = h
            .service
            .add_series(exam.id, SeriesRequest { name: "late".to_string() })
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn sub_documents_must_belong_to_the_examination() {
        let h = harness();
        let a = h.service.create(request(1, 10, 100)).await.unwrap();
        let b = h.service.create(request(1, 10, 100)).await.unwrap();
        let series = h
            .service
            .add_series(a.id, SeriesRequest { name: "S1".to_string() })
            .await
            .unwrap();

        assert_eq!(h.service.delete_series(b.id, series.id).await.unwrap_err().status_code(), 404);
        let err = h
            .service
            .add_asset(b.id, series.id, AssetRequest { url: "A1".to_string() })
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);
    }
}
