use std::net::TcpListener;

use actix_web::dev::Server;
use actix_web::web;
use actix_web::App;
use actix_web::HttpServer;
use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_actix_web::TracingLogger;

use crate::authentication::AdminToken;
use crate::configuration::DatabaseSettings;
use crate::configuration::Settings;
use crate::routes::admin_unsubscribes;
use crate::routes::health_check;
use crate::routes::home;
use crate::routes::method_not_allowed;
use crate::routes::unsubscribe;

/// Arbitrary key for the advisory lock serialising schema creation across
/// instances
const SCHEMA_LOCK_KEY: i64 = 0x756e_7375_6273;

/// Wrapper for actix's `Server` with access to the bound port. Not to be
/// confused with actix's `App`!
pub struct Application {
    /// Left private; use `port` to access
    port: u16,
    server: Server,
}

impl Application {
    /// Bind the listener, connect to the db, make sure the table exists, and
    /// build the `Server`. The server does not run until
    /// `run_until_stopped` is awaited.
    pub async fn build(cfg: Settings) -> Result<Self, anyhow::Error> {
        let addr = format!("{}:{}", cfg.application.host, cfg.application.port);
        let listener = TcpListener::bind(&addr).with_context(|| format!("could not bind {addr}"))?;

        // the OS picks the port when `port` is 0 (tests)
        let port = listener.local_addr()?.port();

        let pool = get_connection_pool(&cfg.database);
        ensure_schema(&pool).await?;

        let admin_token = cfg.admin.token().cloned();
        if admin_token.is_none() {
            tracing::warn!("no admin token configured; /admin will refuse all requests");
        }

        let server = run(listener, pool, AdminToken(admin_token))?;

        Ok(Self { port, server })
    }

    pub fn port(&self) -> u16 { self.port }

    /// Because this consumes `self`, this should be the final function call (or
    /// passed to `tokio::spawn`)
    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> { self.server.await }
}

/// Connections are only opened on first use
pub fn get_connection_pool(db_cfg: &DatabaseSettings) -> PgPool {
    PgPoolOptions::new().connect_lazy_with(db_cfg.connection())
}

/// Create the `unsubscribes` table and its index if they are absent.
///
/// `IF NOT EXISTS` alone is not safe when two instances start at once
/// (Postgres may still report a duplicate type), so creation happens under a
/// transaction-scoped advisory lock.
#[tracing::instrument(name = "Ensuring db schema", skip(pool))]
pub async fn ensure_schema(pool: &PgPool) -> Result<(), anyhow::Error> {
    let mut tx = pool
        .begin()
        .await
        .context("Failed to connect to the database")?;

    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(SCHEMA_LOCK_KEY)
        .execute(&mut *tx)
        .await
        .context("Failed to take schema lock")?;

    sqlx::query(
        "
    CREATE TABLE IF NOT EXISTS unsubscribes (
        id BIGSERIAL PRIMARY KEY,
        email VARCHAR(320) NOT NULL UNIQUE,
        site VARCHAR(100) NULL,
        unsubscribed_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
",
    )
    .execute(&mut *tx)
    .await
    .context("Failed to create unsubscribes table")?;

    sqlx::query(
        "
    CREATE INDEX IF NOT EXISTS unsubscribes_unsubscribed_at_idx
    ON unsubscribes (unsubscribed_at DESC)
",
    )
    .execute(&mut *tx)
    .await
    .context("Failed to create unsubscribes index")?;

    tx.commit().await.context("Failed to commit schema")?;
    Ok(())
}

/// The server is not responsible for binding to an address, it only listens to
/// an already bound address.
///
/// Declares all API endpoints.
pub fn run(
    listener: TcpListener,
    pool: PgPool,
    admin_token: AdminToken,
) -> Result<Server, anyhow::Error> {
    // `Data` is externally an `Arc` (for sharing/cloning)
    let pool = web::Data::new(pool);
    let admin_token = web::Data::new(admin_token);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .route("/", web::get().to(home))
            .route("/health_check", web::get().to(health_check))
            .service(
                web::resource("/unsubscribe")
                    .route(web::post().to(unsubscribe))
                    .default_service(web::to(method_not_allowed)),
            )
            .route("/admin", web::get().to(admin_unsubscribes))
            .app_data(pool.clone())
            .app_data(admin_token.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
