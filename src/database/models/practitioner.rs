use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::database::postgres::{PgQuery, PgQueryAs, PgRecord};
use crate::database::repository::{FieldValue, Record, UniqueKey};
use crate::types::Lifecycle;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Practitioner {
    pub id: i64,
    pub external_identity: String,
    pub license_number: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub specialty: String,
    pub created_at: DateTime<Utc>,
    pub lifecycle: Lifecycle,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewPractitioner {
    pub external_identity: String,
    pub license_number: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub specialty: String,
}

#[derive(Debug, FromRow)]
pub struct PractitionerRow {
    id: i64,
    external_identity: String,
    license_number: String,
    first_name: String,
    last_name: String,
    email: String,
    phone_number: String,
    specialty: String,
    created_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<PractitionerRow> for Practitioner {
    fn from(row: PractitionerRow) -> Self {
        Self {
            id: row.id,
            external_identity: row.external_identity,
            license_number: row.license_number,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone_number: row.phone_number,
            specialty: row.specialty,
            created_at: row.created_at,
            lifecycle: row.deleted_at.into(),
        }
    }
}

impl Record for Practitioner {
    type Id = i64;
    type Draft = NewPractitioner;

    const KIND: &'static str = "practitioner";
    const LOOKUP_FIELDS: &'static [&'static str] = &["external_identity", "license_number"];

    fn id(&self) -> &i64 {
        &self.id
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }

    fn from_draft(id: i64, draft: NewPractitioner, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            external_identity: draft.external_identity,
            license_number: draft.license_number,
            first_name: draft.first_name,
            last_name: draft.last_name,
            email: draft.email,
            phone_number: draft.phone_number,
            specialty: draft.specialty,
            created_at,
            lifecycle: Lifecycle::Active,
        }
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "external_identity" => Some(self.external_identity.clone().into()),
            "license_number" => Some(self.license_number.clone().into()),
            _ => None,
        }
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        let mut keys = vec![UniqueKey {
            constraint: "practitioners_external_identity_key",
            value: self.external_identity.clone(),
            active_only: false,
        }];
        // Auto-provisioned practitioners start without a license number
        if !self.license_number.is_empty() {
            keys.push(UniqueKey {
                constraint: "practitioners_license_number_key",
                value: self.license_number.clone(),
                active_only: false,
            });
        }
        keys
    }
}

impl PgRecord for Practitioner {
    type Row = PractitionerRow;

    const TABLE: &'static str = "practitioners";
    const INSERT_COLUMNS: &'static [&'static str] = &[
        "external_identity",
        "license_number",
        "first_name",
        "last_name",
        "email",
        "phone_number",
        "specialty",
    ];
    const UPDATE_COLUMNS: &'static [&'static str] = &[
        "license_number",
        "first_name",
        "last_name",
        "email",
        "phone_number",
        "specialty",
    ];

    fn bind_insert<'q>(draft: &NewPractitioner, query: PgQueryAs<'q, PractitionerRow>) -> PgQueryAs<'q, PractitionerRow> {
        query
            .bind(draft.external_identity.clone())
            .bind(draft.license_number.clone())
            .bind(draft.first_name.clone())
            .bind(draft.last_name.clone())
            .bind(draft.email.clone())
            .bind(draft.phone_number.clone())
            .bind(draft.specialty.clone())
    }

    fn bind_update<'q>(&self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(self.license_number.clone())
            .bind(self.first_name.clone())
            .bind(self.last_name.clone())
            .bind(self.email.clone())
            .bind(self.phone_number.clone())
            .bind(self.specialty.clone())
    }
}
