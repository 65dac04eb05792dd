use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower::ServiceExt;
use uuid::Uuid;

use shopgate::catalog::{Permission, PermissionSet};
use shopgate::models::principal::{Principal, PrincipalKind, PrincipalStatus};
use shopgate::{app, jwt, utils};

fn jwt_config(exp_hours: i64) -> jwt::JwtConfig {
    jwt::JwtConfig {
        secret: std::sync::Arc::new(b"test_secret".to_vec()),
        exp_hours,
    }
}

fn admin_snapshot(id: Uuid, permissions: PermissionSet) -> Principal {
    let now = chrono::Utc::now();
    Principal {
        id,
        kind: PrincipalKind::Admin,
        username: "kamol".to_string(),
        fullname: "Kamol Test".to_string(),
        phone: "+998900000001".to_string(),
        status: PrincipalStatus::Active,
        permissions,
        store_id: None,
        created_by: None,
        last_login: None,
        created_at: now,
        updated_at: now,
    }
}

async fn seed_admin(pool: &SqlitePool, p: &Principal, password: &str) {
    let now = chrono::Utc::now();
    sqlx::query(
        "INSERT INTO principals (id, kind, username, password_hash, fullname, phone, status, permissions, store_id, created_at, updated_at) \
         VALUES (?, 'admin', ?, ?, ?, ?, 'active', ?, NULL, ?, ?)",
    )
    .bind(p.id.to_string())
    .bind(&p.username)
    .bind(utils::hash_password(password).unwrap())
    .bind(&p.fullname)
    .bind(&p.phone)
    .bind(serde_json::to_string(&p.permissions).unwrap())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .unwrap();
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    let req = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
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
async fn tokens_keep_their_login_time_authority(pool: SqlitePool) {
    std::env::set_var("JWT_SECRET", "test_secret");
    let app = app::create_app(pool.clone()).await.unwrap();

    let snapshot = admin_snapshot(
        Uuid::new_v4(),
        PermissionSet::from_iter([Permission::ManageShopOwners]),
    );
    seed_admin(&pool, &snapshot, "kamol-pass1").await;
    let token = jwt_config(1).encode(&snapshot).unwrap();

    let owner_body = |username: &str, phone: &str| {
        json!({
            "username": username,
            "password": "owner-pass1",
            "fullname": "Owner O",
            "phone": phone,
            "permissions": []
        })
    };

    // 1. the token works while its grants are current
    let (status, v) = send(&app, "POST", "/shop-owners", Some(&token),
        Some(owner_body("olim", "+998935550041"))).await;
    assert_eq!(status, StatusCode::CREATED, "unexpected: {}", v);

    // 2. a revocation lands in the database, not in running sessions
    sqlx::query("UPDATE principals SET permissions = '[]' WHERE id = ?")
        .bind(snapshot.id.to_string())
        .execute(&pool)
        .await
        .unwrap();

    let (status, v) = send(&app, "POST", "/shop-owners", Some(&token),
        Some(owner_body("rustam", "+998935550042"))).await;
    assert_eq!(status, StatusCode::CREATED, "revoked grants should not bind old tokens: {}", v);

    // 3. even a block leaves the session alive until it expires
    sqlx::query("UPDATE principals SET status = 'blocked' WHERE id = ?")
        .bind(snapshot.id.to_string())
        .execute(&pool)
        .await
        .unwrap();

    let (status, _) = send(&app, "GET", "/shop-owners", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    // 4. but a fresh login is where the block bites
    let (status, v) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({"kind": "admin", "username": "kamol", "password": "kamol-pass1"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(v["message"], "account is not active");
}

#[sqlx::test]
async fn expired_or_mangled_tokens_are_refused(pool: SqlitePool) {
    std::env::set_var("JWT_SECRET", "test_secret");
    let app = app::create_app(pool.clone()).await.unwrap();

    let snapshot = admin_snapshot(Uuid::new_v4(), PermissionSet::EMPTY);
    seed_admin(&pool, &snapshot, "kamol-pass1").await;

    // a token that ran out an hour ago
    let expired = jwt_config(-1).encode(&snapshot).unwrap();
    let (status, v) = send(&app, "GET", "/auth/me", Some(&expired), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "unexpected: {}", v);

    // garbage
    let (status, _) = send(&app, "GET", "/auth/me", Some("not.a.token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // signed under a different secret
    let foreign = jwt::JwtConfig {
        secret: std::sync::Arc::new(b"some_other_secret".to_vec()),
        exp_hours: 1,
    }
    .encode(&snapshot)
    .unwrap();
    let (status, _) = send(&app, "GET", "/auth/me", Some(&foreign), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // no bearer prefix
    let good = jwt_config(1).encode(&snapshot).unwrap();
    let req = Request::builder()
        .method("GET")
        .uri("/auth/me")
        .header("Authorization", good.clone())
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // and the well-formed one still passes
    let (status, v) = send(&app, "GET", "/auth/me", Some(&good), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["username"], "kamol");
}

#[sqlx::test]
async fn the_root_logs_in_regardless_of_stored_status(pool: SqlitePool) {
    std::env::set_var("JWT_SECRET", "test_secret");
    let app = app::create_app(pool.clone()).await.unwrap();

    // a root row wedged into 'blocked' from outside the API
    let now = chrono::Utc::now();
    sqlx::query(
        "INSERT INTO principals (id, kind, username, password_hash, fullname, phone, status, permissions, store_id, created_at, updated_at) \
         VALUES (?, 'general', 'root', ?, 'Head Office', '+998900000001', 'blocked', '[]', NULL, ?, ?)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(utils::hash_password("rootpass1").unwrap())
    .bind(now)
    .bind(now)
    .execute(&pool)
    .await
    .unwrap();

    let (status, v) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({"kind": "general", "username": "root", "password": "rootpass1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "the status gate must skip the root: {}", v);
    assert!(v["token"].is_string());
}
