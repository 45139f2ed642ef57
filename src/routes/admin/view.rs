use actix_web::http::header::CacheControl;
use actix_web::http::header::CacheDirective;
use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use htmlescape::encode_attribute;
use htmlescape::encode_minimal;
use sqlx::PgConnection;
use sqlx::PgPool;

use super::count_records;
use super::select_records;
use super::AdminQuery;
use super::DISPLAY_CAP;
use crate::domain::DateRange;
use crate::domain::UnsubscribeRecord;
use crate::routes::ApiError;

#[tracing::instrument(name = "Counting unsubscribes", skip(conn))]
async fn count(
    range: Option<&DateRange>,
    conn: &mut PgConnection,
) -> Result<i64, sqlx::Error> {
    let mut qb = count_records(range);
    let total = qb
        .build_query_scalar::<i64>()
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| {
            tracing::error!("bad query: {e:?}");
            e
        })?;
    Ok(total)
}

#[tracing::instrument(name = "Fetching unsubscribes for display", skip(conn))]
async fn fetch_page(
    range: Option<&DateRange>,
    conn: &mut PgConnection,
) -> Result<Vec<UnsubscribeRecord>, sqlx::Error> {
    let mut qb = select_records(range);
    qb.push(" LIMIT ").push_bind(DISPLAY_CAP);
    let records = qb
        .build_query_as::<UnsubscribeRecord>()
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| {
            tracing::error!("bad query: {e:?}");
            e
        })?;
    Ok(records)
}

/// Count, capped table and export link for a valid (possibly absent) range
pub async fn render(
    query: &AdminQuery,
    range: Option<&DateRange>,
    pool: &PgPool,
) -> Result<HttpResponse, ApiError> {
    // one snapshot for both reads, so the total matches the rows shown
    let mut tx = pool.begin().await?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
        .execute(&mut *tx)
        .await?;
    let total = count(range, &mut tx).await?;
    let records = fetch_page(range, &mut tx).await?;
    tx.commit().await?;

    let filter_desc = match range {
        Some(range) => encode_minimal(&range.describe()),
        None => "all dates".to_string(),
    };

    let mut rows = String::new();
    for rec in &records {
        rows.push_str(&format!(
            "      <tr><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            encode_minimal(&rec.email),
            encode_minimal(rec.site_or_empty()),
            rec.unsubscribed_at_display(),
        ));
    }

    let cap_note = match total > DISPLAY_CAP {
        true => format!(
            "<p><i>Showing the most recent {DISPLAY_CAP} rows; download the CSV for all of them.</i></p>"
        ),
        false => String::new(),
    };

    let content = format!(
        r#"<p>Filter: {filter_desc}</p>
    <p>Total: <b>{total}</b></p>
    <p><a href="{export_link}">Download CSV</a></p>
    {cap_note}
    <table border="1" cellpadding="6">
      <tr><th>Email</th><th>Site</th><th>Unsubscribed at (UTC)</th></tr>
{rows}    </table>"#,
        export_link = encode_minimal(&query.export_link()),
    );

    Ok(page(StatusCode::OK, query, &content))
}

/// The date range could not be parsed: show why, and nothing else. No query
/// is run, so no rows (filtered or otherwise) are shown.
pub fn render_invalid_range(
    query: &AdminQuery,
    msg: &str,
) -> HttpResponse {
    let content = format!(
        "<p><i>{}</i></p>\n    <p>No results: fix the date range and try again.</p>",
        encode_minimal(msg)
    );
    page(StatusCode::BAD_REQUEST, query, &content)
}

fn page(
    status: StatusCode,
    query: &AdminQuery,
    content: &str,
) -> HttpResponse {
    let attr = |v: &Option<String>| encode_attribute(v.as_deref().unwrap_or_default());
    let token = attr(&query.token);
    let clear_link = encode_minimal(&query.clear_link());
    let start = attr(&query.start);
    let end = attr(&query.end);

    let body = format!(
        r#"<!doctype html>
<html lang="en">
  <head>
    <meta http-equiv="content-type" content="text/html; charset=utf-8" />
    <title>Unsubscribes</title>
  </head>
  <body>
    <h1>Unsubscribes</h1>
    <form action="/admin" method="get">
      <input type="hidden" name="token" value="{token}" />
      <label>
        From
        <input type="text" placeholder="DD/MM/YYYY" name="start" value="{start}" />
      </label>
      <label>
        To
        <input type="text" placeholder="DD/MM/YYYY" name="end" value="{end}" />
      </label>
      <button type="submit">Filter</button>
      <a href="{clear_link}">Clear</a>
    </form>
    {content}
  </body>
</html>
"#
    );

    HttpResponse::build(status)
        .content_type(ContentType::html())
        // the token is part of the URL
        .insert_header(CacheControl(vec![CacheDirective::NoStore]))
        .body(body)
}
