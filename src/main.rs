use shopgate::{bootstrap, create_app, db};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_env();
    init_tracing();

    let pool = db::init().await?;
    seed_root(&pool).await?;

    let app = create_app(pool).await?;

    let port = std::env::var("APP_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8000);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

/// Seeds the general admin when the ROOT_* variables are all present.
async fn seed_root(pool: &sqlx::SqlitePool) -> anyhow::Result<()> {
    let (Ok(username), Ok(password), Ok(phone)) = (
        std::env::var("ROOT_USERNAME"),
        std::env::var("ROOT_PASSWORD"),
        std::env::var("ROOT_PHONE"),
    ) else {
        return Ok(());
    };
    let fullname = std::env::var("ROOT_FULLNAME").unwrap_or_else(|_| "General Admin".to_string());

    bootstrap::ensure_general_admin(pool, &username, &password, &phone, &fullname).await?;
    Ok(())
}

fn load_env() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    let _ = dotenvy::from_path(crate_env);
}

fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false);

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
