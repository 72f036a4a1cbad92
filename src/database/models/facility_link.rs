use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::database::postgres::{PgQuery, PgQueryAs, PgRecord};
use crate::database::repository::{FieldValue, Record, UniqueKey};
use crate::types::Lifecycle;

/// Practitioner working at a facility. The link has its own lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilityLink {
    pub id: i64,
    pub facility_id: i64,
    pub practitioner_id: i64,
    pub created_at: DateTime<Utc>,
    pub lifecycle: Lifecycle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewFacilityLink {
    pub facility_id: i64,
    pub practitioner_id: i64,
}

#[derive(Debug, FromRow)]
pub struct FacilityLinkRow {
    id: i64,
    facility_id: i64,
    practitioner_id: i64,
    created_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<FacilityLinkRow> for FacilityLink {
    fn from(row: FacilityLinkRow) -> Self {
        Self {
            id: row.id,
            facility_id: row.facility_id,
            practitioner_id: row.practitioner_id,
            created_at: row.created_at,
            lifecycle: row.deleted_at.into(),
        }
    }
}

impl Record for FacilityLink {
    type Id = i64;
    type Draft = NewFacilityLink;

    const KIND: &'static str = "facility practitioner link";
    const LOOKUP_FIELDS: &'static [&'static str] = &["facility_id", "practitioner_id"];

    fn id(&self) -> &i64 {
        &self.id
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }

    fn from_draft(id: i64, draft: NewFacilityLink, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            facility_id: draft.facility_id,
            practitioner_id: draft.practitioner_id,
            created_at,
            lifecycle: Lifecycle::Active,
        }
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "facility_id" => Some(self.facility_id.into()),
            "practitioner_id" => Some(self.practitioner_id.into()),
            _ => None,
        }
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![UniqueKey {
            constraint: "facility_practitioners_active_pair",
            value: format!("{}:{}", self.facility_id, self.practitioner_id),
            active_only: true,
        }]
    }
}

impl PgRecord for FacilityLink {
    type Row = FacilityLinkRow;

    const TABLE: &'static str = "facility_practitioners";
    const INSERT_COLUMNS: &'static [&'static str] = &["facility_id", "practitioner_id"];
    // Links are never edited, only created and soft-deleted
    const UPDATE_COLUMNS: &'static [&'static str] = &["facility_id", "practitioner_id"];

    fn bind_insert<'q>(draft: &NewFacilityLink, query: PgQueryAs<'q, FacilityLinkRow>) -> PgQueryAs<'q, FacilityLinkRow> {
        query.bind(draft.facility_id).bind(draft.practitioner_id)
    }

    fn bind_update<'q>(&self, query: PgQuery<'q>) -> PgQuery<'q> {
        query.bind(self.facility_id).bind(self.practitioner_id)
    }
}
