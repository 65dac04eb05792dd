use anyhow::Result;
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tempfile::tempdir;
use tower::util::ServiceExt; // for `oneshot`

use shopgate::create_app;

async fn setup() -> Result<(Router, SqlitePool, tempfile::TempDir)> {
    let dir = tempdir()?;
    let db_path = dir.path().join("test.db");

    use sqlx::sqlite::SqliteConnectOptions;
    let opts = SqliteConnectOptions::new()
        .filename(db_path.as_path())
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(opts).await?;

    let migrator = sqlx::migrate::Migrator::new(
        std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations"),
    )
    .await?;
    migrator.run(&pool).await?;

    std::env::set_var("JWT_SECRET", "test-secret");
    let app = create_app(pool.clone()).await?;
    Ok((app, pool, dir))
}

async fn request(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Result<(StatusCode, Value)> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    let req = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(serde_json::to_vec(&body)?))?,
        None => builder.body(Body::empty())?,
    };
    let resp = app.clone().oneshot(req).await?;
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
    let v = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, v))
}

async fn login(app: &Router, kind: &str, username: &str, password: &str) -> Result<String> {
    let (status, v) = request(
        app,
        "POST",
        "/auth/login",
        None,
        Some(json!({"kind": kind, "username": username, "password": password})),
    )
    .await?;
    if status != StatusCode::OK {
        panic!("login as {} failed: {} - {}", username, status, v);
    }
    Ok(v["token"].as_str().unwrap().to_string())
}

#[tokio::test]
async fn grants_narrow_down_the_chain() -> Result<()> {
    let (app, pool, _dir) = setup().await?;
    shopgate::bootstrap::ensure_general_admin(&pool, "root", "rootpass1", "+998901112233", "Head Office")
        .await?;
    let root_token = login(&app, "general", "root", "rootpass1").await?;

    // 1. unknown tags are rejected by name, never silently dropped
    let (status, v) = request(
        &app,
        "POST",
        "/admins",
        Some(&root_token),
        Some(json!({
            "username": "farrukh",
            "password": "farrukh-pw",
            "fullname": "Farrukh T",
            "phone": "+998935550021",
            "permissions": ["manage_shops", "manage_everything"]
        })),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["error"], "validation");
    assert!(
        v["message"].as_str().unwrap().contains("manage_everything"),
        "rejection should name the bad tag: {}",
        v
    );

    // 2. the root hands an admin a mixed platform/store set
    let (status, v) = request(
        &app,
        "POST",
        "/admins",
        Some(&root_token),
        Some(json!({
            "username": "farrukh",
            "password": "farrukh-pw",
            "fullname": "Farrukh T",
            "phone": "+998935550021",
            "permissions": ["manage_shop_owners", "manage_shops", "manage_products"]
        })),
    )
    .await?;
    if status != StatusCode::CREATED {
        panic!("admin create failed: {} - {}", status, v);
    }
    let admin_token = login(&app, "admin", "farrukh", "farrukh-pw").await?;

    // 3. an admin can pass on only what it holds, and only store-level tags
    let owner_body = |perms: Value| {
        json!({
            "username": "olim",
            "password": "olim-secret",
            "fullname": "Olim Karimov",
            "phone": "+998935550022",
            "permissions": perms
        })
    };

    let (status, v) = request(
        &app,
        "POST",
        "/shop-owners",
        Some(&admin_token),
        Some(owner_body(json!(["manage_orders"]))),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "unexpected: {}", v);
    assert!(v["message"].as_str().unwrap().contains("manage_orders"));

    let (status, v) = request(
        &app,
        "POST",
        "/shop-owners",
        Some(&admin_token),
        Some(owner_body(json!(["manage_admins"]))),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "unexpected: {}", v);
    assert!(v["message"].as_str().unwrap().contains("manage_admins"));

    let (status, v) = request(
        &app,
        "POST",
        "/shop-owners",
        Some(&admin_token),
        Some(owner_body(json!(["manage_products"]))),
    )
    .await?;
    if status != StatusCode::CREATED {
        panic!("owner create failed: {} - {}", status, v);
    }
    let owner_id = v["id"].as_str().unwrap().to_string();
    assert_eq!(v["permissions"], json!(["manage_products"]));

    // 4. the root is uncapped inside the delegatable set, but no further
    let (status, v) = request(
        &app,
        "POST",
        "/shop-owners",
        Some(&root_token),
        Some(json!({
            "username": "rustam",
            "password": "rustam-pw",
            "fullname": "Rustam B",
            "phone": "+998935550023",
            "permissions": ["manage_orders", "view_statistics"]
        })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED, "unexpected: {}", v);

    let (status, v) = request(
        &app,
        "POST",
        "/shop-owners",
        Some(&root_token),
        Some(json!({
            "username": "said",
            "password": "said-pw12",
            "fullname": "Said N",
            "phone": "+998935550024",
            "permissions": ["manage_shops"]
        })),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "unexpected: {}", v);
    assert!(v["message"].as_str().unwrap().contains("manage_shops"));

    // 5. give olim a shop to staff
    let (status, v) = request(
        &app,
        "POST",
        "/shops",
        Some(&admin_token),
        Some(json!({
            "name": "Oq Tepa",
            "owner_id": owner_id,
            "phone": "+998712000031",
            "address": "Oq Tepa dahasi 4, Tashkent",
            "tariff": "Standard"
        })),
    )
    .await?;
    if status != StatusCode::CREATED {
        panic!("shop create failed: {} - {}", status, v);
    }
    let shop_id = v["id"].as_str().unwrap().to_string();
    let owner_token = login(&app, "shop_owner", "olim", "olim-secret").await?;

    // 6. the owner can only hand assistants tags out of its own set
    let assistant_body = |perms: Value| {
        json!({
            "username": "yulduz",
            "password": "yulduz-pw",
            "fullname": "Yulduz R",
            "phone": "+998935550025",
            "store_id": shop_id,
            "permissions": perms
        })
    };

    let (status, v) = request(
        &app,
        "POST",
        "/assistants",
        Some(&owner_token),
        Some(assistant_body(json!({"manage_products": true, "manage_orders": true}))),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "unexpected: {}", v);
    let message = v["message"].as_str().unwrap();
    assert!(message.contains("manage_orders"), "unexpected: {}", v);
    assert!(
        !message.contains("manage_products"),
        "only the offending tag should be named: {}",
        v
    );
    // nothing was persisted
    let (status, v) = request(&app, "GET", "/assistants", Some(&owner_token), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v.as_array().unwrap().len(), 0, "a rejected grant must not create: {}", v);

    let (status, v) = request(
        &app,
        "POST",
        "/assistants",
        Some(&owner_token),
        Some(assistant_body(json!({"manage_admins": true}))),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "unexpected: {}", v);

    let (status, v) = request(
        &app,
        "POST",
        "/assistants",
        Some(&owner_token),
        Some(assistant_body(json!({"manage_products": true, "view_statistics": false}))),
    )
    .await?;
    if status != StatusCode::CREATED {
        panic!("assistant create failed: {} - {}", status, v);
    }
    // false entries do not grant
    assert_eq!(v["permissions"], json!(["manage_products"]));
    let assistant_id = v["id"].as_str().unwrap().to_string();

    // 7. regrants go through the same cap as creation
    let (status, v) = request(
        &app,
        "PUT",
        &format!("/shop-owners/{}/permissions", owner_id),
        Some(&admin_token),
        Some(json!({"permissions": ["manage_products", "manage_contracts"]})),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "unexpected: {}", v);
    assert!(v["message"].as_str().unwrap().contains("manage_contracts"));

    let (status, v) = request(
        &app,
        "PUT",
        &format!("/shop-owners/{}/permissions", owner_id),
        Some(&root_token),
        Some(json!({"permissions": [
            "manage_assistants", "manage_categories", "manage_products",
            "manage_orders", "manage_installments", "manage_contracts",
            "view_statistics"
        ]})),
    )
    .await?;
    assert_eq!(status, StatusCode::OK, "unexpected: {}", v);
    assert_eq!(v["permissions"].as_array().unwrap().len(), 7);

    // 8. the widened grant reaches the owner only through a fresh login
    let (status, v) = request(
        &app,
        "PUT",
        &format!("/assistants/{}/permissions", assistant_id),
        Some(&owner_token),
        Some(json!({"permissions": {"manage_orders": true}})),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "stale token should still cap: {}", v);

    let owner_token = login(&app, "shop_owner", "olim", "olim-secret").await?;
    let (status, v) = request(
        &app,
        "PUT",
        &format!("/assistants/{}/permissions", assistant_id),
        Some(&owner_token),
        Some(json!({"permissions": {"manage_orders": true}})),
    )
    .await?;
    assert_eq!(status, StatusCode::OK, "unexpected: {}", v);
    assert_eq!(v["permissions"], json!(["manage_orders"]));

    Ok(())
}

#[tokio::test]
async fn admins_get_any_tag_and_owners_none_above_store_level() -> Result<()> {
    let (app, pool, _dir) = setup().await?;
    shopgate::bootstrap::ensure_general_admin(&pool, "root", "rootpass1", "+998901112233", "Head Office")
        .await?;
    let root_token = login(&app, "general", "root", "rootpass1").await?;

    // the full catalog is grantable to an admin, platform tags included
    let (status, v) = request(
        &app,
        "POST",
        "/admins",
        Some(&root_token),
        Some(json!({
            "username": "zarina",
            "password": "zarina-pw",
            "fullname": "Zarina M",
            "phone": "+998935550031",
            "permissions": [
                "manage_admins", "manage_tariffs", "manage_shops", "manage_shop_owners",
                "manage_assistants", "manage_categories", "manage_products",
                "manage_orders", "manage_installments", "manage_contracts",
                "view_statistics"
            ]
        })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED, "unexpected: {}", v);
    assert_eq!(v["permissions"].as_array().unwrap().len(), 11);

    Ok(())
}
