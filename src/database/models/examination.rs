// Examination documents: the examination itself and the image series,
// image assets and attachments that reference it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::postgres::{PgQuery, PgQueryAs, PgRecord};
use crate::database::repository::{FieldValue, Record, UniqueKey};
use crate::types::Lifecycle;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Examination {
    pub id: Uuid,
    pub practitioner_id: i64,
    pub individual_id: i64,
    pub facility_id: i64,
    pub passcode: String,
    pub created_at: DateTime<Utc>,
    pub lifecycle: Lifecycle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewExamination {
    pub practitioner_id: i64,
    pub individual_id: i64,
    pub facility_id: i64,
    pub passcode: String,
}

#[derive(Debug, FromRow)]
pub struct ExaminationRow {
    id: Uuid,
    practitioner_id: i64,
    individual_id: i64,
    facility_id: i64,
    passcode: String,
    created_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<ExaminationRow> for Examination {
    fn from(row: ExaminationRow) -> Self {
        Self {
            id: row.id,
            practitioner_id: row.practitioner_id,
            individual_id: row.individual_id,
            facility_id: row.facility_id,
            passcode: row.passcode,
            created_at: row.created_at,
            lifecycle: row.deleted_at.into(),
        }
    }
}

impl Record for Examination {
    type Id = Uuid;
    type Draft = NewExamination;

    const KIND: &'static str = "examination";
    const LOOKUP_FIELDS: &'static [&'static str] = &["passcode", "practitioner_id", "individual_id", "facility_id"];

    fn id(&self) -> &Uuid {
        &self.id
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }

    fn from_draft(id: Uuid, draft: NewExamination, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            practitioner_id: draft.practitioner_id,
            individual_id: draft.individual_id,
            facility_id: draft.facility_id,
            passcode: draft.passcode,
            created_at,
            lifecycle: Lifecycle::Active,
        }
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "passcode" => Some(self.passcode.clone().into()),
            "practitioner_id" => Some(self.practitioner_id.into()),
            "individual_id" => Some(self.individual_id.into()),
            "facility_id" => Some(self.facility_id.into()),
            _ => None,
        }
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![UniqueKey {
            constraint: "examinations_active_passcode",
            value: self.passcode.clone(),
            active_only: true,
        }]
    }
}

impl PgRecord for Examination {
    type Row = ExaminationRow;

    const TABLE: &'static str = "examinations";
    const INSERT_COLUMNS: &'static [&'static str] = &["practitioner_id", "individual_id", "facility_id", "passcode"];
    // The passcode is issued once and never rewritten
    const UPDATE_COLUMNS: &'static [&'static str] = &["practitioner_id", "individual_id", "facility_id"];

    fn bind_insert<'q>(draft: &NewExamination, query: PgQueryAs<'q, ExaminationRow>) -> PgQueryAs<'q, ExaminationRow> {
        query
            .bind(draft.practitioner_id)
            .bind(draft.individual_id)
            .bind(draft.facility_id)
            .bind(draft.passcode.clone())
    }

    fn bind_update<'q>(&self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(self.practitioner_id)
            .bind(self.individual_id)
            .bind(self.facility_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSeries {
    pub id: Uuid,
    pub examination_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub lifecycle: Lifecycle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewImageSeries {
    pub examination_id: Uuid,
    pub name: String,
}

#[derive(Debug, FromRow)]
pub struct ImageSeriesRow {
    id: Uuid,
    examination_id: Uuid,
    name: String,
    created_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<ImageSeriesRow> for ImageSeries {
    fn from(row: ImageSeriesRow) -> Self {
        Self {
            id: row.id,
            examination_id: row.examination_id,
            name: row.name,
            created_at: row.created_at,
            lifecycle: row.deleted_at.into(),
        }
    }
}

impl Record for ImageSeries {
    type Id = Uuid;
    type Draft = NewImageSeries;

    const KIND: &'static str = "image series";
    const LOOKUP_FIELDS: &'static [&'static str] = &["examination_id"];

    fn id(&self) -> &Uuid {
        &self.id
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }

    fn from_draft(id: Uuid, draft: NewImageSeries, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            examination_id: draft.examination_id,
            name: draft.name,
            created_at,
            lifecycle: Lifecycle::Active,
        }
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "examination_id" => Some(self.examination_id.into()),
            _ => None,
        }
    }
}

impl PgRecord for ImageSeries {
    type Row = ImageSeriesRow;

    const TABLE: &'static str = "image_series";
    const INSERT_COLUMNS: &'static [&'static str] = &["examination_id", "name"];
    const UPDATE_COLUMNS: &'static [&'static str] = &["name"];

    fn bind_insert<'q>(draft: &NewImageSeries, query: PgQueryAs<'q, ImageSeriesRow>) -> PgQueryAs<'q, ImageSeriesRow> {
        query.bind(draft.examination_id).bind(draft.name.clone())
    }

    fn bind_update<'q>(&self, query: PgQuery<'q>) -> PgQuery<'q> {
        query.bind(self.name.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAsset {
    pub id: Uuid,
    pub series_id: Uuid,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub lifecycle: Lifecycle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewImageAsset {
    pub series_id: Uuid,
    pub url: String,
}

#[derive(Debug, FromRow)]
pub struct ImageAssetRow {
    id: Uuid,
    series_id: Uuid,
    url: String,
    created_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<ImageAssetRow> for ImageAsset {
    fn from(row: ImageAssetRow) -> Self {
        Self {
            id: row.id,
            series_id: row.series_id,
            url: row.url,
            created_at: row.created_at,
            lifecycle: row.deleted_at.into(),
        }
    }
}

impl Record for ImageAsset {
    type Id = Uuid;
    type Draft = NewImageAsset;

    const KIND: &'static str = "image asset";
    const LOOKUP_FIELDS: &'static [&'static str] = &["series_id"];

    fn id(&self) -> &Uuid {
        &self.id
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }

    fn from_draft(id: Uuid, draft: NewImageAsset, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            series_id: draft.series_id,
            url: draft.url,
            created_at,
            lifecycle: Lifecycle::Active,
        }
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "series_id" => Some(self.series_id.into()),
            _ => None,
        }
    }
}

impl PgRecord for ImageAsset {
    type Row = ImageAssetRow;

    const TABLE: &'static str = "image_assets";
    const INSERT_COLUMNS: &'static [&'static str] = &["series_id", "url"];
    const UPDATE_COLUMNS: &'static [&'static str] = &["url"];

    fn bind_insert<'q>(draft: &NewImageAsset, query: PgQueryAs<'q, ImageAssetRow>) -> PgQueryAs<'q, ImageAssetRow> {
        query.bind(draft.series_id).bind(draft.url.clone())
    }

    fn bind_update<'q>(&self, query: PgQuery<'q>) -> PgQuery<'q> {
        query.bind(self.url.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: Uuid,
    pub examination_id: Uuid,
    pub name: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub lifecycle: Lifecycle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttachment {
    pub examination_id: Uuid,
    pub name: String,
    pub url: String,
}

#[derive(Debug, FromRow)]
pub struct AttachmentRow {
    id: Uuid,
    examination_id: Uuid,
    name: String,
    url: String,
    created_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<AttachmentRow> for Attachment {
    fn from(row: AttachmentRow) -> Self {
        Self {
            id: row.id,
            examination_id: row.examination_id,
            name: row.name,
            url: row.url,
            created_at: row.created_at,
            lifecycle: row.deleted_at.into(),
        }
    }
}

impl Record for Attachment {
    type Id = Uuid;
    type Draft = NewAttachment;

    const KIND: &'static str = "attachment";
    const LOOKUP_FIELDS: &'static [&'static str] = &["examination_id"];

    fn id(&self) -> &Uuid {
        &self.id
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }

    fn from_draft(id: Uuid, draft: NewAttachment, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            examination_id: draft.examination_id,
            name: draft.name,
            url: draft.url,
            created_at,
            lifecycle: Lifecycle::Active,
        }
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "examination_id" => Some(self.examination_id.into()),
            _ => None,
        }
    }
}

impl PgRecord for Attachment {
    type Row = AttachmentRow;

    const TABLE: &'static str = "attachments";
    const INSERT_COLUMNS: &'static [&'static str] = &["examination_id", "name", "url"];
    const UPDATE_COLUMNS: &'static [&'static str] = &["name", "url"];

    fn bind_insert<'q>(draft: &NewAttachment, query: PgQueryAs<'q, AttachmentRow>) -> PgQueryAs<'q, AttachmentRow> {
        query
            .bind(draft.examination_id)
            .bind(draft.name.clone())
            .bind(draft.url.clone())
    }

    fn bind_update<'q>(&self, query: PgQuery<'q>) -> PgQuery<'q> {
        query.bind(self.name.clone()).bind(self.url.clone())
    }
}
