use actix_web::http::header::ContentType;
use actix_web::web;
use actix_web::HttpResponse;
use serde::Deserialize;

#[derive(Deserialize)]
pub struct HomeQuery {
    site: Option<String>,
}

/// `GET /`
///
/// The unsubscribe form. An optional `site` query parameter is carried into
/// the form as a hidden field, so each site can link here with its own label.
pub async fn home(query: web::Query<HomeQuery>) -> HttpResponse {
    let site = query
        .site
        .as_deref()
        .map(htmlescape::encode_attribute)
        .unwrap_or_default();

    HttpResponse::Ok()
        .content_type(ContentType::html())
        // path relative to this file (checked at compile time!)
        .body(include_str!("./home.html").replace("{site}", &site))
}
