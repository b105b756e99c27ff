use anyhow::Context;
use stall_server::{Config, Server, ServerState, print_banner, setup_environment};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. dotenv + logging
    setup_environment();

    print_banner();

    // 2. configuration
    let config = Config::from_env();
    tracing::info!(
        work_dir = %config.work_dir,
        http_port = config.http_port,
        event_name = %config.event_name,
        timezone = %config.timezone,
        "Stall server starting..."
    );

    // 3. catalog, print log, services
    let state = ServerState::initialize(&config).context("Failed to initialize server state")?;

    // 4. HTTP server until ctrl-c
    let server = Server::with_state(config, state);
    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
