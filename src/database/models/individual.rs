use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::database::postgres::{PgQuery, PgQueryAs, PgRecord};
use crate::database::repository::{FieldValue, Record, UniqueKey};
use crate::types::Lifecycle;

/// A patient, identified by their national identification number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Individual {
    pub id: i64,
    pub national_id: String,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: NaiveDate,
    pub gender: String,
    pub email: String,
    pub phone_number: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
    pub lifecycle: Lifecycle,
}

/// Missing text fields arrive blank so validation can report all of them
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewIndividual {
    #[serde(default)]
    pub national_id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub birth_date: NaiveDate,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, FromRow)]
pub struct IndividualRow {
    id: i64,
    national_id: String,
    first_name: String,
    last_name: String,
    birth_date: NaiveDate,
    gender: String,
    email: String,
    phone_number: String,
    address: String,
    created_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<IndividualRow> for Individual {
    fn from(row: IndividualRow) -> Self {
        Self {
            id: row.id,
            national_id: row.national_id,
            first_name: row.first_name,
            last_name: row.last_name,
            birth_date: row.birth_date,
            gender: row.gender,
            email: row.email,
            phone_number: row.phone_number,
            address: row.address,
            created_at: row.created_at,
            lifecycle: row.deleted_at.into(),
        }
    }
}

impl Record for Individual {
    type Id = i64;
    type Draft = NewIndividual;

    const KIND: &'static str = "patient";
    const LOOKUP_FIELDS: &'static [&'static str] = &["national_id"];

    fn id(&self) -> &i64 {
        &self.id
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }

    fn from_draft(id: i64, draft: NewIndividual, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            national_id: draft.national_id,
            first_name: draft.first_name,
            last_name: draft.last_name,
            birth_date: draft.birth_date,
            gender: draft.gender,
            email: draft.email,
            phone_number: draft.phone_number,
            address: draft.address,
            created_at,
            lifecycle: Lifecycle::Active,
        }
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "national_id" => Some(self.national_id.clone().into()),
            _ => None,
        }
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![UniqueKey {
            constraint: "individuals_active_national_id",
            value: self.national_id.clone(),
            active_only: true,
        }]
    }
}

impl PgRecord for Individual {
    type Row = IndividualRow;

    const TABLE: &'static str = "individuals";
    const INSERT_COLUMNS: &'static [&'static str] = &[
        "national_id",
        "first_name",
        "last_name",
        "birth_date",
        "gender",
        "email",
        "phone_number",
        "address",
    ];
    const UPDATE_COLUMNS: &'static [&'static str] = &[
        "national_id",
        "first_name",
        "last_name",
        "birth_date",
        "gender",
        "email",
        "phone_number",
        "address",
    ];

    fn bind_insert<'q>(draft: &NewIndividual, query: PgQueryAs<'q, IndividualRow>) -> PgQueryAs<'q, IndividualRow> {
        query
            .bind(draft.national_id.clone())
            .bind(draft.first_name.clone())
            .bind(draft.last_name.clone())
            .bind(draft.birth_date)
            .bind(draft.gender.clone())
            .bind(draft.email.clone())
            .bind(draft.phone_number.clone())
            .bind(draft.address.clone())
    }

    fn bind_update<'q>(&self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(self.national_id.clone())
            .bind(self.first_name.clone())
            .bind(self.last_name.clone())
            .bind(self.birth_date)
            .bind(self.gender.clone())
            .bind(self.email.clone())
            .bind(self.phone_number.clone())
            .bind(self.address.clone())
    }
}
