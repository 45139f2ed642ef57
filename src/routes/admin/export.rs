use actix_web::http::header::CacheControl;
use actix_web::http::header::CacheDirective;
use actix_web::http::header::ContentDisposition;
use actix_web::http::header::CONTENT_TYPE;
use actix_web::http::header::DispositionParam;
use actix_web::http::header::DispositionType;
use actix_web::web::Bytes;
use actix_web::HttpResponse;
use async_stream::try_stream;
use futures::stream;
use futures::Stream;
use futures::StreamExt;
use futures::TryStreamExt;
use sqlx::PgPool;

use super::select_records;
use crate::domain::DateRange;
use crate::domain::UnsubscribeRecord;
use crate::routes::ApiError;

const HEADER: [&str; 3] = ["email", "site", "unsubscribed_at"];

#[derive(thiserror::Error, Debug)]
pub enum ExportError {
    #[error("Failed to read unsubscribes")]
    Query(#[from] sqlx::Error),
    #[error("Failed to encode CSV row")]
    Encode(#[from] csv::Error),
}

/// `unsubscribes_all_UTC.csv`, or the range spelled out
pub fn file_name(range: Option<&DateRange>) -> String {
    match range {
        Some(range) => format!("unsubscribes_{}.csv", range.file_label()),
        None => "unsubscribes_all_UTC.csv".to_string(),
    }
}

impl From<ExportError> for ApiError {
    fn from(e: ExportError) -> Self {
        match e {
            ExportError::Query(e) => Self::StorageFailure(e),
            ExportError::Encode(e) => Self::Unexpected(e.into()),
        }
    }
}

/// A CSV attachment whose body is streamed straight from the database
/// cursor, one encoded row at a time.
///
/// The first row is fetched before any header is sent, so a failing query is
/// still answered with a 500. Past that point a failure can only be logged
/// and the body cut short.
pub async fn csv_response(
    pool: PgPool,
    range: Option<DateRange>,
) -> Result<HttpResponse, ApiError> {
    let header = csv_line(&HEADER).map_err(ExportError::from)?;
    let mut rows = Box::pin(record_stream(pool, range));
    let first = rows.try_next().await?;

    let disposition = ContentDisposition {
        disposition: DispositionType::Attachment,
        parameters: vec![DispositionParam::Filename(file_name(range.as_ref()))],
    };

    let head = stream::iter(std::iter::once(header).chain(first).map(Ok));
    let body = head.chain(rows).inspect_err(|e| {
        tracing::error!(
            error.cause_chain = ?e,
            error.message = %e,
            "CSV export aborted"
        )
    });

    Ok(HttpResponse::Ok()
        .insert_header((CONTENT_TYPE, "text/csv; charset=utf-8"))
        .insert_header(disposition)
        .insert_header(CacheControl(vec![CacheDirective::NoStore]))
        .streaming(body))
}

/// Encoded data rows, header excluded
fn record_stream(
    pool: PgPool,
    range: Option<DateRange>,
) -> impl Stream<Item = Result<Bytes, ExportError>> {
    try_stream! {
        let mut qb = select_records(range.as_ref());
        let mut rows = qb.build_query_as::<UnsubscribeRecord>().fetch(&pool);
        let mut sent: u64 = 0;
        while let Some(rec) = rows.try_next().await? {
            let unsubscribed_at = rec.unsubscribed_at_display();
            yield csv_line(&[
                rec.email.as_str(),
                rec.site_or_empty(),
                unsubscribed_at.as_str(),
            ])?;
            sent += 1;
        }
        tracing::info!(rows = sent, "CSV export finished");
    }
}

/// One RFC 4180 record, CRLF terminated
fn csv_line(fields: &[&str]) -> Result<Bytes, csv::Error> {
    let mut wtr = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(Vec::new());
    wtr.write_record(fields)?;
    let buf = wtr.into_inner().map_err(|e| e.into_error())?;
    Ok(Bytes::from(buf))
}
