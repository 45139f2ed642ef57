mod export;
mod view;

use actix_web::web;
use actix_web::HttpResponse;
use serde::Serialize;
use sqlx::PgPool;
use sqlx::Postgres;
use sqlx::QueryBuilder;

use super::ApiError;
use crate::authentication::AdminToken;
use crate::domain::DateRange;

/// Maximum number of rows rendered in the HTML view. The CSV export is not
/// capped.
pub const DISPLAY_CAP: i64 = 500;

/// Query string of `GET /admin`. Also serialized back into the CSV export
/// link, so the export carries the same token and filter.
#[derive(Serialize, Default)]
pub struct AdminQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    download: Option<String>,
}

impl AdminQuery {
    /// Pick the known keys out of the raw query pairs. A repeated key keeps
    /// its last value and unknown keys are ignored, so no query string can
    /// fail before the token is checked.
    fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut query = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "token" => &mut query.token,
                "start" => &mut query.start,
                "end" => &mut query.end,
                "download" => &mut query.download,
                _ => continue,
            };
            *slot = Some(value);
        }
        query
    }

    fn wants_csv(&self) -> bool { self.download.as_deref() == Some("1") }

    /// The same request, in CSV mode
    fn export_link(&self) -> String {
        AdminQuery {
            token: self.token.clone(),
            start: self.start.clone(),
            end: self.end.clone(),
            download: Some("1".to_string()),
        }
        .to_link()
    }

    /// The HTML view with no filter
    fn clear_link(&self) -> String {
        AdminQuery {
            token: self.token.clone(),
            ..Default::default()
        }
        .to_link()
    }

    fn to_link(&self) -> String {
        // a struct of optional strings always serializes
        format!(
            "/admin?{}",
            serde_urlencoded::to_string(self).unwrap_or_default()
        )
    }
}

/// `GET /admin`
///
/// 1. check `token` against the configured admin token
/// 2. parse the optional `start`/`end` (`DD/MM/YYYY`) into a UTC day range
/// 3. `download=1`: stream every matching row as CSV; otherwise render the
///    count and up to `DISPLAY_CAP` rows as HTML
///
/// A bad date range is a plain 400 in CSV mode. In HTML mode the page is
/// rendered with the error and no query is run.
#[tracing::instrument(
    name = "Viewing unsubscribes",
    skip(params, pool, admin_token),
    fields(start = tracing::field::Empty, end = tracing::field::Empty, csv = tracing::field::Empty)
)]
pub async fn admin_unsubscribes(
    params: web::Query<Vec<(String, String)>>,
    pool: web::Data<PgPool>,
    admin_token: web::Data<AdminToken>,
) -> Result<HttpResponse, ApiError> {
    let query = AdminQuery::from_pairs(params.into_inner());
    let span = tracing::Span::current();
    span.record("start", tracing::field::debug(&query.start));
    span.record("end", tracing::field::debug(&query.end));
    span.record("csv", query.wants_csv());

    admin_token.verify(query.token.as_deref())?;

    let range = DateRange::parse(query.start.as_deref(), query.end.as_deref());

    if query.wants_csv() {
        let range = range.map_err(ApiError::InvalidInput)?;
        return export::csv_response(pool.get_ref().clone(), range).await;
    }

    match range {
        Ok(range) => view::render(&query, range.as_ref(), &pool).await,
        Err(msg) => {
            tracing::info!(error.message = %msg, "rejected date range");
            Ok(view::render_invalid_range(&query, &msg))
        }
    }
}

/// `SELECT email, site, unsubscribed_at` over the filtered table, newest
/// first. `id` breaks ties between identical timestamps.
fn select_records(range: Option<&DateRange>) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT email, site, unsubscribed_at FROM unsubscribes");
    push_range_filter(&mut qb, range);
    qb.push(" ORDER BY unsubscribed_at DESC, id DESC");
    qb
}

fn count_records(range: Option<&DateRange>) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM unsubscribes");
    push_range_filter(&mut qb, range);
    qb
}

/// The one filter predicate shared by the count, view and export queries.
/// Bounds are bound parameters, never interpolated.
fn push_range_filter(
    qb: &mut QueryBuilder<'static, Postgres>,
    range: Option<&DateRange>,
) {
    if let Some(range) = range {
        qb.push(" WHERE unsubscribed_at BETWEEN ")
            .push_bind(range.start())
            .push(" AND ")
            .push_bind(range.end());
    }
}
