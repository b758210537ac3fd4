//! Conversions shared by the Mongo documents.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use mongodb::Collection;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{self, Bson, Document, Regex, doc};
use pagination::{PageParams, Paginated};
use serde::de::DeserializeOwned;

use crate::domain::ports::RepositoryError;

use super::error_mapping::query_error;

/// Domain id → ObjectId. Domain ids are validated hex, so failure means a
/// corrupt value slipped through.
pub(super) fn oid(id: &impl AsRef<str>) -> Result<ObjectId, RepositoryError> {
    ObjectId::parse_str(id.as_ref()).map_err(|err| RepositoryError::corrupt(err.to_string()))
}

pub(super) fn oid_opt<T: AsRef<str>>(id: Option<&T>) -> Result<Option<ObjectId>, RepositoryError> {
    id.map(oid).transpose()
}

/// ObjectId → domain id.
pub(super) fn id_from<T>(value: ObjectId) -> Result<T, RepositoryError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .to_hex()
        .parse()
        .map_err(|err: T::Err| RepositoryError::corrupt(err.to_string()))
}

pub(super) fn ids_from<T>(values: Vec<ObjectId>) -> Result<Vec<T>, RepositoryError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    values.into_iter().map(id_from).collect()
}

pub(super) fn to_bson_date(value: DateTime<Utc>) -> bson::DateTime {
    bson::DateTime::from_chrono(value)
}

pub(super) fn from_bson_date(value: bson::DateTime) -> DateTime<Utc> {
    value.to_chrono()
}

/// Serialise a domain value that maps to a BSON scalar or document.
pub(super) fn to_bson(value: &impl serde::Serialize) -> Result<Bson, RepositoryError> {
    bson::to_bson(value).map_err(|err| RepositoryError::query(err.to_string()))
}

/// Anchored, case-insensitive equality match.
pub(super) fn equals_ignore_case(value: &str) -> Regex {
    Regex {
        pattern: format!("^{}$", escape_regex(value)),
        options: "i".to_owned(),
    }
}

/// Case-insensitive substring match.
pub(super) fn contains_ignore_case(value: &str) -> Regex {
    Regex {
        pattern: escape_regex(value),
        options: "i".to_owned(),
    }
}

fn escape_regex(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if "\\^$.|?*+()[]{}".contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Newest-first sort used by every listing.
pub(super) fn newest_first() -> Document {
    doc! { "createdAt": -1 }
}

/// Run `filter` and collect every match, newest first.
pub(super) async fn find_all<D>(
    collection: &Collection<D>,
    filter: Document,
    limit: Option<i64>,
) -> Result<Vec<D>, RepositoryError>
where
    D: DeserializeOwned + Send + Sync,
{
    let mut find = collection.find(filter).sort(newest_first());
    if let Some(limit) = limit {
        find = find.limit(limit);
    }
    find.await
        .map_err(query_error)?
        .try_collect()
        .await
        .map_err(query_error)
}

/// Run `filter` for one page, newest first, with the total match count.
pub(super) async fn find_page<D>(
    collection: &Collection<D>,
    filter: Document,
    page: PageParams,
) -> Result<Paginated<D>, RepositoryError>
where
    D: DeserializeOwned + Send + Sync,
{
    let total = collection
        .count_documents(filter.clone())
        .await
        .map_err(query_error)?;
    let items = collection
        .find(filter)
        .sort(newest_first())
        .skip(page.offset())
        .limit(i64::from(page.limit()))
        .await
        .map_err(query_error)?
        .try_collect()
        .await
        .map_err(query_error)?;
    Ok(Paginated::new(items, total, page))
}

/// Convert every document on a page, keeping the paging metadata.
pub(super) fn convert_page<D, T>(
    page: Paginated<D>,
    convert: impl Fn(D) -> Result<T, RepositoryError>,
) -> Result<Paginated<T>, RepositoryError> {
    let items = page
        .items
        .into_iter()
        .map(convert)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Paginated {
        items,
        total: page.total,
        page: page.page,
        limit: page.limit,
        total_pages: page.total_pages,
    })
}

/// Sum a numeric field across documents matching `filter`.
pub(super) async fn sum_field<D>(
    collection: &Collection<D>,
    filter: Document,
    field: &str,
) -> Result<u64, RepositoryError>
where
    D: Send + Sync,
{
    let pipeline = [
        doc! { "$match": filter },
        doc! { "$group": { "_id": Bson::Null, "total": { "$sum": format!("${field}") } } },
    ];
    let groups: Vec<Document> = collection
        .aggregate(pipeline)
        .await
        .map_err(query_error)?
        .try_collect()
        .await
        .map_err(query_error)?;
    let total = match groups.first().and_then(|group| group.get("total")) {
        Some(Bson::Int64(value)) => *value,
        Some(Bson::Int32(value)) => i64::from(*value),
        Some(Bson::Double(value)) => value.round() as i64,
        _ => 0,
    };
    Ok(u64::try_from(total).unwrap_or(0))
}
