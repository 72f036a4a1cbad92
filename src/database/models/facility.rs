use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::database::postgres::{PgQuery, PgQueryAs, PgRecord};
use crate::database::repository::{FieldValue, Record, UniqueKey};
use crate::types::Lifecycle;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    pub id: i64,
    pub external_identity: String,
    pub name: String,
    pub address: String,
    pub email: String,
    pub phone_number: String,
    pub created_at: DateTime<Utc>,
    pub lifecycle: Lifecycle,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewFacility {
    pub external_identity: String,
    pub name: String,
    pub address: String,
    pub email: String,
    pub phone_number: String,
}

#[derive(Debug, FromRow)]
pub struct FacilityRow {
    id: i64,
    external_identity: String,
    name: String,
    address: String,
    email: String,
    phone_number: String,
    created_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<FacilityRow> for Facility {
    fn from(row: FacilityRow) -> Self {
        Self {
            id: row.id,
            external_identity: row.external_identity,
            name: row.name,
            address: row.address,
            email: row.email,
            phone_number: row.phone_number,
            created_at: row.created_at,
            lifecycle: row.deleted_at.into(),
        }
    }
}

impl Record for Facility {
    type Id = i64;
    type Draft = NewFacility;

    const KIND: &'static str = "facility";
    const LOOKUP_FIELDS: &'static [&'static str] = &["external_identity"];

    fn id(&self) -> &i64 {
        &self.id
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }

    fn from_draft(id: i64, draft: NewFacility, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            external_identity: draft.external_identity,
            name: draft.name,
            address: draft.address,
            email: draft.email,
            phone_number: draft.phone_number,
            created_at,
            lifecycle: Lifecycle::Active,
        }
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "external_identity" => Some(self.external_identity.clone().into()),
            _ => None,
        }
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![UniqueKey {
            constraint: "facilities_external_identity_key",
            value: self.external_identity.clone(),
            active_only: false,
        }]
    }
}

impl PgRecord for Facility {
    type Row = FacilityRow;

    const TABLE: &'static str = "facilities";
    const INSERT_COLUMNS: &'static [&'static str] = &["external_identity", "name", "address", "email", "phone_number"];
    const UPDATE_COLUMNS: &'static [&'static str] = &["name", "address", "email", "phone_number"];

    fn bind_insert<'q>(draft: &NewFacility, query: PgQueryAs<'q, FacilityRow>) -> PgQueryAs<'q, FacilityRow> {
        query
            .bind(draft.external_identity.clone())
            .bind(draft.name.clone())
            .bind(draft.address.clone())
            .bind(draft.email.clone())
            .bind(draft.phone_number.clone())
    }

    fn bind_update<'q>(&self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(self.name.clone())
            .bind(self.address.clone())
            .bind(self.email.clone())
            .bind(self.phone_number.clone())
    }
}
