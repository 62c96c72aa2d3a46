mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use common::{scoped_token, token, TestApp};

#[tokio::test]
async fn root_and_health_are_public() -> Result<()> {
    let app = TestApp::new();

    let (status, body) = app.send(Method::GET, "/", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Funnel Dashboard API");

    let (status, body) = app.send(Method::GET, "/health", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn degraded_health_hides_driver_detail() -> Result<()> {
    let app = TestApp::new();
    app.warehouse.set_failing(true);

    let (status, body) = app.send(Method::GET, "/health", None, None).await?;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["data"]["status"], "degraded");
    assert_eq!(body["data"]["warehouse"], "unavailable");
    assert!(!body.to_string().contains("10.20.0.5"));
    Ok(())
}

#[tokio::test]
async fn missing_or_bad_tokens_are_unauthorized() -> Result<()> {
    let app = TestApp::new();

    let (status, _) = app.send(Method::GET, "/api/auth/permissions", None, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .send(Method::GET, "/api/auth/permissions", Some("not-a-jwt"), None)
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
    Ok(())
}

#[tokio::test]
async fn unknown_role_is_unauthorized() -> Result<()> {
    let app = TestApp::new();
    let token = token("someone@example.com", "superuser");

    let (status, _) = app.send(Method::GET, "/api/auth/permissions", Some(&token), None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn sga_without_scope_claim_is_unauthorized() -> Result<()> {
    let app = TestApp::new();
    let token = token("ana@example.com", "sga");

    let (status, _) = app.send(Method::GET, "/api/auth/permissions", Some(&token), None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn permissions_reflect_role_and_scope() -> Result<()> {
    let app = TestApp::new();
    let token = scoped_token("ana@example.com", "sga", Some("Ana Ruiz"), None);

    let (status, body) = app.send(Method::GET, "/api/auth/permissions", Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK);

    let data = &body["data"];
    assert_eq!(data["role"], "sga");
    assert_eq!(data["allowedPages"], serde_json::json!([1, 8]));
    assert_eq!(data["scopes"]["sga"], "Ana Ruiz");
    assert_eq!(data["canExport"], false);
    Ok(())
}

#[tokio::test]
async fn page_gate_follows_role() -> Result<()> {
    let app = TestApp::new();
    let partner = token("cp@example.com", "capital_partner");
    let admin = token("root@example.com", "admin");

    let (status, _) = app.send(Method::GET, "/api/pages/13", Some(&partner), None).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.send(Method::GET, "/api/pages/1", Some(&partner), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    // Unknown page ids follow the role default
    let (status, _) = app.send(Method::GET, "/api/pages/99", Some(&admin), None).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.send(Method::GET, "/api/pages/99", Some(&partner), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}
