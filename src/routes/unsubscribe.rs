use actix_web::http::header::ContentType;
use actix_web::web;
use actix_web::HttpResponse;
use serde::Deserialize;
use sqlx::PgPool;

use super::ApiError;
use crate::domain::NewUnsubscribe;
use crate::domain::SiteLabel;
use crate::domain::UnsubscribeEmail;

/// Both fields default to empty, so a missing `email` is reported as an
/// invalid address rather than a deserialization failure.
#[derive(Deserialize)]
pub struct FormData {
    #[serde(default)]
    email: String,
    #[serde(default)]
    site: String,
}

impl TryFrom<FormData> for NewUnsubscribe {
    type Error = String;
    fn try_from(value: FormData) -> Result<Self, Self::Error> {
        let email = UnsubscribeEmail::parse(value.email)?;
        let site = SiteLabel::parse(value.site)?;
        Ok(NewUnsubscribe { email, site })
    }
}

/// `POST /unsubscribe`
///
/// Records that `email` opted out, optionally tagged with the `site` that
/// sent the request. Repeating the request for the same email replaces the
/// site and refreshes the timestamp.
///
/// # Request example
///
/// ```sh
///     curl --data 'email=john@foo.com&site=blog' http://127.0.0.1:8000/unsubscribe
/// ```
#[tracing::instrument(
    name = "Recording unsubscribe",
    skip(form, pool),
    fields(
        unsubscribe_email = %form.email.trim(),
        unsubscribe_site = %form.site.trim(),
    )
)]
pub async fn unsubscribe(
    form: web::Form<FormData>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    let new_unsub: NewUnsubscribe = form.0.try_into().map_err(ApiError::InvalidInput)?;

    upsert_unsubscribe(&new_unsub, &pool).await?;

    Ok(HttpResponse::Ok()
        .content_type(ContentType::plaintext())
        .body("You have been unsubscribed."))
}

/// Insert a record for an unseen email, or overwrite `site` and refresh
/// `unsubscribed_at` for a known one. A single statement, so concurrent
/// requests for the same email cannot produce a duplicate row.
#[tracing::instrument(name = "Upserting unsubscribe into db", skip(new_unsub, pool))]
pub async fn upsert_unsubscribe(
    new_unsub: &NewUnsubscribe,
    pool: &PgPool,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "
    INSERT INTO unsubscribes (email, site)
    VALUES ($1, $2)
    ON CONFLICT (email) DO UPDATE
    SET site = EXCLUDED.site,
        unsubscribed_at = now()
",
    )
    .bind(new_unsub.email.as_ref())
    .bind(new_unsub.site.as_ref().map(AsRef::<str>::as_ref))
    .execute(pool)
    .await
    .map_err(|e| {
        tracing::error!("bad query: {e:?}");
        e
    })?;
    Ok(())
}
