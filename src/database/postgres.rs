use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::{FromRow, PgPool, Postgres};
use std::marker::PhantomData;

use crate::database::repository::{FieldValue, Lookup, Record, RecordId, Repository, StoreError, StoreResult};
use crate::types::Scope;

pub type PgQueryAs<'q, O> = sqlx::query::QueryAs<'q, Postgres, O, PgArguments>;
pub type PgQuery<'q> = sqlx::query::Query<'q, Postgres, PgArguments>;

/// Table metadata and bind logic for records stored in PostgreSQL.
///
/// Every table has `id`, `created_at` and a nullable `deleted_at`; ids and
/// creation timestamps are assigned by column defaults.
pub trait PgRecord: Record {
    type Row: for<'r> FromRow<'r, PgRow> + Send + Unpin + Into<Self>;

    const TABLE: &'static str;

    /// Columns written on insert, in bind order
    const INSERT_COLUMNS: &'static [&'static str];

    /// Columns rewritten on update, in bind order after the id
    const UPDATE_COLUMNS: &'static [&'static str];

    fn bind_insert<'q>(draft: &Self::Draft, query: PgQueryAs<'q, Self::Row>) -> PgQueryAs<'q, Self::Row>;

    fn bind_update<'q>(&self, query: PgQuery<'q>) -> PgQuery<'q>;
}

pub struct PgRepository<R> {
    pool: PgPool,
    _phantom: PhantomData<R>,
}

impl<R: PgRecord> PgRepository<R> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _phantom: PhantomData,
        }
    }

    fn insert_sql() -> String {
        let placeholders = (1..=R::INSERT_COLUMNS.len())
            .map(|i| format!("${}", i))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
            R::TABLE,
            R::INSERT_COLUMNS.join(", "),
            placeholders
        )
    }

    fn update_sql() -> String {
        let assignments = R::UPDATE_COLUMNS
            .iter()
            .enumerate()
            .map(|(i, column)| format!("{} = ${}", column, i + 2))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "UPDATE {} SET {} WHERE id = $1 AND deleted_at IS NULL",
            R::TABLE,
            assignments
        )
    }

    fn select_sql(filter: &[Lookup], scope: Scope) -> StoreResult<String> {
        let mut sql = format!("SELECT * FROM {} WHERE TRUE", R::TABLE);
        for (i, lookup) in filter.iter().enumerate() {
            // Field names are interpolated, so only whitelisted columns get through
            if !R::LOOKUP_FIELDS.contains(&lookup.field) {
                return Err(StoreError::UnknownField { kind: R::KIND, field: lookup.field });
            }
            sql.push_str(&format!(" AND {} = ${}", lookup.field, i + 1));
        }
        if scope == Scope::Active {
            sql.push_str(" AND deleted_at IS NULL");
        }
        sql.push_str(" ORDER BY created_at, id");
        Ok(sql)
    }

    fn write_error(err: sqlx::Error) -> StoreError {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return StoreError::Duplicate {
                    kind: R::KIND,
                    constraint: db_err.constraint().unwrap_or("unique").to_string(),
                };
            }
        }
        StoreError::Sqlx(err)
    }
}

fn bind_value_as<'q, O>(query: PgQueryAs<'q, O>, value: &FieldValue) -> PgQueryAs<'q, O> {
    match value {
        FieldValue::Int(v) => query.bind(*v),
        FieldValue::Text(v) => query.bind(v.clone()),
        FieldValue::Uuid(v) => query.bind(*v),
    }
}

fn bind_value<'q>(query: PgQuery<'q>, value: &FieldValue) -> PgQuery<'q> {
    match value {
        FieldValue::Int(v) => query.bind(*v),
        FieldValue::Text(v) => query.bind(v.clone()),
        FieldValue::Uuid(v) => query.bind(*v),
    }
}

#[async_trait]
impl<R: PgRecord> Repository<R> for PgRepository<R> {
    async fn insert(&self, draft: R::Draft) -> StoreResult<R> {
        let sql = Self::insert_sql();
        let query = R::bind_insert(&draft, sqlx::query_as::<_, R::Row>(&sql));
        let row = query.fetch_one(&self.pool).await.map_err(Self::write_error)?;
        Ok(row.into())
    }

    async fn get(&self, id: &R::Id, scope: Scope) -> StoreResult<Option<R>> {
        let mut sql = format!("SELECT * FROM {} WHERE id = $1", R::TABLE);
        if scope == Scope::Active {
            sql.push_str(" AND deleted_at IS NULL");
        }
        let query = bind_value_as(sqlx::query_as::<_, R::Row>(&sql), &id.to_field_value());
        let row = query.fetch_optional(&self.pool).await?;
        Ok(row.map(Into::into))
    }

    async fn find(&self, filter: &[Lookup], scope: Scope) -> StoreResult<Vec<R>> {
        let sql = Self::select_sql(filter, scope)?;
        let mut query = sqlx::query_as::<_, R::Row>(&sql);
        for lookup in filter {
            query = bind_value_as(query, &lookup.value);
        }
        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update(&self, record: &R) -> StoreResult<bool> {
        let sql = Self::update_sql();
        let query = record.bind_update(bind_value(sqlx::query(&sql), &record.id().to_field_value()));
        let result = query.execute(&self.pool).await.map_err(Self::write_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn soft_delete(&self, id: &R::Id, at: DateTime<Utc>) -> StoreResult<bool> {
        let sql = format!(
            "UPDATE {} SET deleted_at = $2 WHERE id = $1 AND deleted_at IS NULL",
            R::TABLE
        );
        let result = bind_value(sqlx::query(&sql), &id.to_field_value())
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
