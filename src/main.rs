use unsubscribe_registry::configuration::get_configuration;
use unsubscribe_registry::startup::Application;
use unsubscribe_registry::telemetry::get_subscriber;
use unsubscribe_registry::telemetry::init_subscriber;

/// Initialise telemetry, load config, and start the server
#[tokio::main] // requires tokio features: macros, rt-multi-thread
async fn main() -> Result<(), anyhow::Error> {
    let subscriber = get_subscriber("unsubscribe-registry", "info", std::io::stdout);
    init_subscriber(subscriber)?;

    let cfg = get_configuration()?;

    let app = Application::build(cfg).await?;
    tracing::info!(port = app.port(), "listening");

    match app.run_until_stopped().await {
        Ok(()) => tracing::info!("server exited gracefully"),
        Err(e) => {
            tracing::error!(
                error.cause_chain=?e,
                error.message=%e,
                "server failed"
            );
            return Err(e.into());
        }
    }
    Ok(())
}
