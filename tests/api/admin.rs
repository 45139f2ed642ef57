use chrono::DateTime;
use chrono::Duration;
use chrono::TimeZone;
use chrono::Utc;

use crate::helpers::spawn_app;
use crate::helpers::spawn_app_with_admin_token;
use crate::helpers::TestApp;

fn at(
    y: i32,
    m: u32,
    d: u32,
    h: u32,
    min: u32,
    s: u32,
) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
}

/// Rows straddling 12/12/2025 - 20/12/2025
async fn seed_december(app: &TestApp) {
    app.insert_at("before@example.com", Some("blog"), at(2025, 12, 11, 23, 59, 59)).await;
    app.insert_at("first@example.com", Some("blog"), at(2025, 12, 12, 0, 0, 0)).await;
    app.insert_at("middle@example.com", None, at(2025, 12, 15, 12, 30, 0)).await;
    app.insert_at(
        "last@example.com",
        Some("news"),
        at(2025, 12, 20, 23, 59, 59) + Duration::milliseconds(500),
    )
    .await;
    app.insert_at("after@example.com", Some("news"), at(2025, 12, 21, 0, 0, 0)).await;
}

/// Data lines of a CSV body, header excluded
fn csv_emails(body: &str) -> Vec<String> {
    body.lines()
        .skip(1)
        .map(|l| l.split(',').next().unwrap().to_string())
        .collect()
}

/// Emails in the HTML table, in page order
fn html_emails(html: &str) -> Vec<String> {
    html.split("<tr><td>")
        .skip(1)
        .map(|row| row.split("</td>").next().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn wrong_or_missing_token_is_forbidden() {
    let app = spawn_app().await;
    app.insert_at("a@example.com", None, Utc::now()).await;

    for params in [
        vec![],
        vec![("token", "")],
        vec![("token", "wrong")],
        vec![("token", "wrong"), ("download", "1")],
        vec![("token", "wrong"), ("start", "20/12/2025"), ("end", "12/12/2025")],
        vec![("start", "12/12/2025")],
    ] {
        let resp = app.get_admin_raw(&params).await;
        assert_eq!(resp.status().as_u16(), 403, "{params:?}");
        let body = resp.text().await.unwrap();
        assert_eq!(body, "Access denied");
    }
}

/// Repeated keys never fail parsing; the last value is the one checked
#[tokio::test]
async fn repeated_token_uses_last_value() {
    let app = spawn_app().await;
    let token = app.admin_token.as_str();

    let resp = app.get_admin_raw(&[("token", token), ("token", "wrong")]).await;
    assert_eq!(resp.status().as_u16(), 403);
    assert_eq!(resp.text().await.unwrap(), "Access denied");

    let resp = app
        .get_admin_raw(&[("token", "wrong"), ("download", "1"), ("token", token)])
        .await;
    assert_eq!(resp.status().as_u16(), 200);
}

#[tokio::test]
async fn unconfigured_token_is_a_server_error() {
    for token in [None, Some("".to_string()), Some("   ".to_string())] {
        let app = spawn_app_with_admin_token(token).await;

        let resp = app.get_admin_raw(&[("token", "")]).await;
        assert_eq!(resp.status().as_u16(), 500);
        assert_eq!(resp.text().await.unwrap(), "Server misconfiguration");

        // the recorder keeps working
        let resp = app.post_unsubscribe("email=a%40example.com").await;
        assert_eq!(resp.status().as_u16(), 200);
    }
}

/// write `blog`, write `news`, view shows one row with `news`
#[tokio::test]
async fn view_shows_latest_site() {
    let app = spawn_app().await;

    app.post_unsubscribe("email=a%40example.com&site=blog").await;
    app.post_unsubscribe("email=a%40example.com&site=news").await;

    let resp = app.get_admin(&[]).await;
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.headers()["cache-control"], "no-store");

    let html = resp.text().await.unwrap();
    assert_eq!(html_emails(&html), ["a@example.com"]);
    assert!(html.contains("<tr><td>a@example.com</td><td>news</td>"));
    assert!(html.contains("Total: <b>1</b>"));
}

#[tokio::test]
async fn view_is_newest_first_and_escaped() {
    let app = spawn_app().await;

    app.insert_at("old@example.com", Some("<b>x"), at(2024, 1, 1, 0, 0, 0)).await;
    app.insert_at("new@example.com", None, at(2025, 1, 1, 8, 9, 10)).await;

    let html = app.get_admin_html(&[]).await;

    assert_eq!(html_emails(&html), ["new@example.com", "old@example.com"]);
    assert!(html.contains("<td>&lt;b&gt;x</td>"));
    assert!(html.contains("<td>2025-01-01 08:09:10</td>"));
    assert!(html.contains("Filter: all dates"));
}

#[tokio::test]
async fn view_filters_by_inclusive_day_range() {
    let app = spawn_app().await;
    seed_december(&app).await;

    let html = app
        .get_admin_html(&[("start", "12/12/2025"), ("end", "20/12/2025")])
        .await;

    assert_eq!(
        html_emails(&html),
        ["last@example.com", "middle@example.com", "first@example.com"]
    );
    assert!(html.contains("Total: <b>3</b>"));
    assert!(html.contains("2025-12-12 00:00:00 to 2025-12-20 23:59:59 UTC"));
    // export link carries token and filter
    assert!(html.contains(&format!(
        "/admin?token={}&amp;start=12%2F12%2F2025&amp;end=20%2F12%2F2025&amp;download=1",
        app.admin_token
    )));
}

#[tokio::test]
async fn view_is_capped_but_count_is_not() {
    let app = spawn_app().await;

    sqlx::query(
        "
    INSERT INTO unsubscribes (email, unsubscribed_at)
    SELECT 'user' || n || '@example.com', now() - n * interval '1 minute'
    FROM generate_series(1, 501) AS n
",
    )
    .execute(&app.pool)
    .await
    .unwrap();

    let html = app.get_admin_html(&[]).await;
    let emails = html_emails(&html);

    assert!(html.contains("Total: <b>501</b>"));
    assert_eq!(emails.len(), 500);
    assert_eq!(emails[0], "user1@example.com");
    assert!(!emails.contains(&"user501@example.com".to_string()));
    assert!(html.contains("Showing the most recent 500 rows"));

    // the export is not capped
    let csv = app.get_admin(&[("download", "1")]).await.text().await.unwrap();
    assert_eq!(csv_emails(&csv).len(), 501);
}

#[tokio::test]
async fn csv_export_of_everything() {
    let app = spawn_app().await;
    app.insert_at("old@example.com", Some("news, weekly"), at(2024, 1, 1, 0, 0, 0))
        .await;
    app.insert_at("new@example.com", None, at(2025, 1, 1, 8, 9, 10)).await;

    let resp = app.get_admin(&[("download", "1")]).await;

    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.headers()["content-type"], "text/csv; charset=utf-8");
    assert_eq!(resp.headers()["cache-control"], "no-store");
    let disposition = resp.headers()["content-disposition"].to_str().unwrap();
    assert!(disposition.starts_with("attachment"), "{disposition}");
    assert!(disposition.contains("unsubscribes_all_UTC.csv"), "{disposition}");

    let body = resp.text().await.unwrap();
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(
        lines,
        [
            "email,site,unsubscribed_at",
            "new@example.com,,2025-01-01 08:09:10",
            "old@example.com,\"news, weekly\",2024-01-01 00:00:00",
        ]
    );
}

#[tokio::test]
async fn csv_export_filtered() {
    let app = spawn_app().await;
    seed_december(&app).await;

    let resp = app
        .get_admin(&[
            ("start", "12/12/2025"),
            ("end", "20/12/2025"),
            ("download", "1"),
        ])
        .await;

    assert_eq!(resp.status().as_u16(), 200);
    let disposition = resp.headers()["content-disposition"].to_str().unwrap();
    assert!(
        disposition.contains("2025-12-12_00-00-00_to_2025-12-20_23-59-59_UTC"),
        "{disposition}"
    );

    let body = resp.text().await.unwrap();
    assert_eq!(
        csv_emails(&body),
        ["last@example.com", "middle@example.com", "first@example.com"]
    );
}

#[tokio::test]
async fn view_and_export_agree() {
    let app = spawn_app().await;
    seed_december(&app).await;

    for params in [
        vec![],
        vec![("start", "15/12/2025"), ("end", "21/12/2025")],
        vec![("start", "01/01/2020"), ("end", "01/01/2021")],
    ] {
        let html = app.get_admin_html(&params).await;

        let mut csv_params = params.clone();
        csv_params.push(("download", "1"));
        let csv = app.get_admin(&csv_params).await.text().await.unwrap();

        assert_eq!(html_emails(&html), csv_emails(&csv), "{params:?}");
    }
}

#[tokio::test]
async fn one_sided_range_is_rejected() {
    let app = spawn_app().await;
    seed_december(&app).await;

    for params in [[("start", "12/12/2025")], [("end", "20/12/2025")]] {
        let resp = app.get_admin(&params).await;
        assert_eq!(resp.status().as_u16(), 400, "{params:?}");
        let html = resp.text().await.unwrap();
        assert!(html.contains("Please provide both a start and an end date"));
        assert!(html_emails(&html).is_empty());

        let mut csv_params = params.to_vec();
        csv_params.push(("download", "1"));
        let resp = app.get_admin(&csv_params).await;
        assert_eq!(resp.status().as_u16(), 400, "{params:?}");
        assert_eq!(
            resp.text().await.unwrap(),
            "Please provide both a start and an end date"
        );
    }
}

#[tokio::test]
async fn end_before_start_is_rejected_without_results() {
    let app = spawn_app().await;
    seed_december(&app).await;

    let params = [("start", "20/12/2025"), ("end", "12/12/2025")];

    let resp = app.get_admin(&params).await;
    assert_eq!(resp.status().as_u16(), 400);
    let html = resp.text().await.unwrap();
    assert!(html.contains("End date must not be before start date"));
    assert!(html_emails(&html).is_empty());
    assert!(!html.contains("Total:"));
    assert!(!html.contains("download=1"));

    let resp = app.get_admin(&[params[0], params[1], ("download", "1")]).await;
    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn invalid_dates_name_the_field() {
    let app = spawn_app().await;

    for (start, end, field) in [
        ("2025-12-12", "20/12/2025", "start"),
        ("12/12/2025", "31/02/2025", "end"),
        ("32/01/2025", "01/02/2025", "start"),
        ("01/01/-5000", "01/01/2025", "start"),
        ("1/1/25", "2/1/25", "start"),
        ("01/01/2025", "01/01/25", "end"),
    ] {
        let resp = app
            .get_admin(&[("start", start), ("end", end), ("download", "1")])
            .await;
        assert_eq!(resp.status().as_u16(), 400);
        let msg = resp.text().await.unwrap();
        assert!(msg.starts_with(&format!("Invalid {field} date")), "{msg}");
    }
}

/// An empty filter form submission means "no filter"
#[tokio::test]
async fn blank_dates_are_unfiltered() {
    let app = spawn_app().await;
    seed_december(&app).await;

    let html = app.get_admin_html(&[("start", ""), ("end", "")]).await;
    assert_eq!(html_emails(&html).len(), 5);
}

#[tokio::test]
async fn storage_failure_is_500_in_both_modes() {
    let app = spawn_app().await;

    sqlx::query("ALTER TABLE unsubscribes DROP COLUMN site")
        .execute(&app.pool)
        .await
        .unwrap();

    for params in [vec![], vec![("download", "1")]] {
        let resp = app.get_admin(&params).await;
        assert_eq!(resp.status().as_u16(), 500, "{params:?}");
        assert!(resp.headers().get("content-disposition").is_none());
        assert_eq!(resp.text().await.unwrap(), "Internal Server Error");
    }
}

/// Count and rows come from the same snapshot, even while rows are added
#[tokio::test]
async fn total_matches_rows_under_concurrent_writes() {
    let app = spawn_app().await;

    let pool = app.pool.clone();
    let writer = tokio::spawn(async move {
        for i in 0..200 {
            sqlx::query("INSERT INTO unsubscribes (email) VALUES ($1)")
                .bind(format!("w{i}@example.com"))
                .execute(&pool)
                .await
                .unwrap();
        }
    });

    for _ in 0..20 {
        let html = app.get_admin_html(&[]).await;
        let shown = html_emails(&html).len();
        assert!(html.contains(&format!("Total: <b>{shown}</b>")), "{shown} rows shown");
    }
    writer.await.unwrap();
}
