use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::Value;
use sqlx::SqlitePool;
use tower::ServiceExt;
use uuid::Uuid;

use shopgate::catalog::PermissionSet;
use shopgate::models::principal::{Principal, PrincipalKind, PrincipalStatus};
use shopgate::{app, jwt};

fn token_for(p: &Principal) -> String {
    let jwt_config = jwt::JwtConfig {
        secret: std::sync::Arc::new(b"test_secret".to_vec()),
        exp_hours: 1,
    };
    jwt_config.encode(p).unwrap()
}

async fn seed_account(
    pool: &SqlitePool,
    kind: PrincipalKind,
    username: &str,
    phone: &str,
    store_id: Option<Uuid>,
) -> Principal {
    let now = chrono::Utc::now();
    let p = Principal {
        id: Uuid::new_v4(),
        kind,
        username: username.to_string(),
        fullname: format!("{} Test", username),
        phone: phone.to_string(),
        status: PrincipalStatus::Active,
        permissions: PermissionSet::EMPTY,
        store_id,
        created_by: None,
        last_login: None,
        created_at: now,
        updated_at: now,
    };
    sqlx::query(
        "INSERT INTO principals (id, kind, username, password_hash, fullname, phone, status, permissions, store_id, created_at, updated_at) \
         VALUES (?, ?, ?, 'hash', ?, ?, 'active', '[]', ?, ?, ?)",
    )
    .bind(p.id.to_string())
    .bind(p.kind.as_str())
    .bind(&p.username)
    .bind(&p.fullname)
    .bind(&p.phone)
    .bind(p.store_id.map(|id| id.to_string()))
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .unwrap();
    p
}

async fn seed_shop(pool: &SqlitePool, owner_id: Uuid, name: &str, phone: &str) -> Uuid {
    let id = Uuid::new_v4();
    let now = chrono::Utc::now();
    sqlx::query(
        "INSERT INTO shops (id, name, owner_id, phone, address, status, tariff, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, 'active', 'Basic', ?, ?)",
    )
    .bind(id.to_string())
    .bind(name)
    .bind(owner_id.to_string())
    .bind(phone)
    .bind(format!("{} street 12, Tashkent", name))
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .unwrap();
    id
}

async fn send(app: &axum::Router, method: &str, uri: &str, token: &str) -> (StatusCode, Value) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let v = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, v)
}

#[sqlx::test]
async fn deletions_never_cascade(pool: SqlitePool) {
    std::env::set_var("JWT_SECRET", "test_secret");
    let app = app::create_app(pool.clone()).await.unwrap();

    let root = seed_account(&pool, PrincipalKind::General, "root", "+998900000001", None).await;
    let owner = seed_account(&pool, PrincipalKind::ShopOwner, "gulnora", "+998900000002", None).await;
    let shop = seed_shop(&pool, owner.id, "Chorsu Bozori", "+998712000001").await;
    let staff = seed_account(&pool, PrincipalKind::Assistant, "bekzod", "+998900000003", Some(shop)).await;
    let root_token = token_for(&root);
    let staff_token = token_for(&staff);

    // 1. dropping the owner strands the shop but harms nothing else
    let (status, _) = send(&app, "DELETE", &format!("/shop-owners/{}", owner.id), &root_token).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, v) = send(&app, "GET", &format!("/shops/{}", shop), &root_token).await;
    assert_eq!(status, StatusCode::OK, "unexpected: {}", v);
    assert_eq!(v["owner_id"], owner.id.to_string(), "the stale pointer is kept as-is");

    let (status, _) = send(&app, "GET", &format!("/assistants/{}", staff.id), &root_token).await;
    assert_eq!(status, StatusCode::OK);

    // the assistant keeps reading its shop
    let (status, _) = send(&app, "GET", &format!("/shops/{}", shop), &staff_token).await;
    assert_eq!(status, StatusCode::OK);

    // 2. dropping the shop strands the assistant the same way
    let (status, _) = send(&app, "DELETE", &format!("/shops/{}", shop), &root_token).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, v) = send(&app, "GET", &format!("/assistants/{}", staff.id), &root_token).await;
    assert_eq!(status, StatusCode::OK, "unexpected: {}", v);
    assert_eq!(v["store_id"], shop.to_string(), "the store link stays in place");

    let (status, _) = send(&app, "GET", &format!("/shops/{}", shop), &staff_token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let assistants: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM principals WHERE kind = 'assistant'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(assistants, 1);
}

#[sqlx::test]
async fn orphaned_staff_drop_out_of_ownership_paths(pool: SqlitePool) {
    std::env::set_var("JWT_SECRET", "test_secret");
    let app = app::create_app(pool.clone()).await.unwrap();

    let root = seed_account(&pool, PrincipalKind::General, "root", "+998900000001", None).await;
    let owner = seed_account(&pool, PrincipalKind::ShopOwner, "gulnora", "+998900000002", None).await;
    let other = seed_account(&pool, PrincipalKind::ShopOwner, "madina", "+998900000004", None).await;
    let shop = seed_shop(&pool, owner.id, "Chorsu Bozori", "+998712000001").await;
    seed_shop(&pool, other.id, "Parkent Bozori", "+998712000002").await;
    let staff = seed_account(&pool, PrincipalKind::Assistant, "bekzod", "+998900000003", Some(shop)).await;

    let (status, _) = send(&app, "DELETE", &format!("/shops/{}", shop), &token_for(&root)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // no owner can see or touch the stranded assistant
    let (status, v) = send(&app, "GET", &format!("/assistants/{}", staff.id), &token_for(&other)).await;
    assert_eq!(status, StatusCode::NOT_FOUND, "unexpected: {}", v);

    let (status, v) = send(&app, "GET", "/assistants", &token_for(&owner)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v.as_array().unwrap().len(), 0, "a dead store shields its staff: {}", v);

    // the top keeps full visibility
    let (status, _) = send(&app, "GET", &format!("/assistants/{}", staff.id), &token_for(&root)).await;
    assert_eq!(status, StatusCode::OK);
}
