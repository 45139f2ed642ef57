use crate::helpers::spawn_app;

#[tokio::test]
async fn form_posts_to_unsubscribe() {
    let app = spawn_app().await;

    let resp = reqwest::get(format!("{}/", app.addr)).await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let html = resp.text().await.unwrap();
    assert!(html.contains(r#"action="/unsubscribe""#));
    assert!(html.contains(r#"method="post""#));
    assert!(html.contains(r#"name="email""#));
}

#[tokio::test]
async fn site_is_carried_and_escaped() {
    let app = spawn_app().await;

    let html = reqwest::get(format!("{}/?site=%22%3Eblog", app.addr))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert!(html.contains(r#"name="site" value="&quot;&gt;blog""#), "{html}");
}
