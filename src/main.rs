use std::sync::Arc;

use clap::Parser;

use chatwidget_gateway::assistant::{AssistantGateway, OpenAiConnector};
use chatwidget_gateway::bootstrap::{LogFormat, init_logging};
use chatwidget_gateway::cli::{Cli, Command, hash_password};
use chatwidget_gateway::config::Config;
use chatwidget_gateway::settings::{SettingsStore, WidgetSettings};
use chatwidget_gateway::web::{AdminAuth, GatewayState, start_server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Some(Command::HashPassword { password }) = &cli.command {
        println!("{}", hash_password(password)?);
        return Ok(());
    }

    let mut config = Config::from_env()?;
    init_logging(LogFormat::from_env());

    if let Some(host) = cli.host {
        config.http.host = host;
    }
    if let Some(port) = cli.port {
        config.http.port = port;
    }

    if config.admin.default_password {
        tracing::warn!(
            "ADMIN_PASSWORD_HASH is not set; the admin console accepts the default password. \
             Run `chatwidget-gateway hash-password <PASSWORD>` and set ADMIN_PASSWORD_HASH."
        );
    }
    if config.admin.ephemeral_secret {
        tracing::warn!("JWT_SECRET is not set; using a random secret, admin tokens will not survive a restart");
    }

    let settings = Arc::new(SettingsStore::new(WidgetSettings::from_provider_config(
        &config.provider,
    )));
    if settings.credentials().await.is_none() {
        tracing::warn!("OPENAI_API_KEY or ASSISTANT_ID is not set; chat is disabled until configured from /admin");
    }

    let connector = Arc::new(OpenAiConnector::new(config.provider.base_url.clone())?);
    let gateway = Arc::new(AssistantGateway::new(settings.clone(), connector));
    let auth = Arc::new(AdminAuth::from_config(&config.admin));

    let state = Arc::new(GatewayState {
        settings,
        gateway,
        auth,
    });

    let server = start_server(
        &config.http.bind_address(),
        state,
        &config.http.allowed_origins,
    )
    .await?;

    tracing::info!(addr = %server.addr, "Chat widget gateway listening");
    tracing::info!("Widget script: http://{}/widget.js", server.addr);
    tracing::info!("Admin console: http://{}/admin", server.addr);

    shutdown_signal().await;
    server.shutdown().await?;
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
