use std::sync::Arc;

use anyhow::Context;
use secrecy::ExposeSecret;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use bizhub::adapters::auth::JwtSessionValidator;
use bizhub::adapters::gateway::RazorpayGateway;
use bizhub::adapters::http::billing::{BillingAppState, BillingPorts, BillingSettings};
use bizhub::adapters::http::middleware::AuthState;
use bizhub::adapters::http::{app_router, HttpSettings};
use bizhub::adapters::notification::{LogNotifier, ResendEmailNotifier};
use bizhub::adapters::postgres::{PostgresAccountRepository, PostgresTransactionLedger};
use bizhub::config::{AppConfig, ServerConfig};
use bizhub::domain::billing::PlanCatalog;
use bizhub::ports::NotificationSink;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("loading configuration")?;
    config.validate().context("validating configuration")?;

    init_tracing(&config.server);

    let pool = config
        .database
        .pool_options()
        .connect(config.database.url.expose_secret())
        .await
        .context("connecting to database")?;
    info!(url = %config.database.redacted_url(), "Database connected");

    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Migrations applied");
    }

    let gateway = RazorpayGateway::new(config.payment.gateway_config())?;
    info!(
        live = config.payment.is_live_mode(),
        test = config.payment.is_test_mode(),
        "Payment gateway configured"
    );

    let notifier: Arc<dyn NotificationSink> = match config.email.api_key() {
        Some(api_key) => Arc::new(ResendEmailNotifier::new(api_key, config.email.from_header())),
        None => {
            info!("No email API key configured; confirmations are logged only");
            Arc::new(LogNotifier)
        }
    };

    let state = BillingAppState::new(
        BillingPorts {
            catalog: Arc::new(PlanCatalog::builtin()),
            ledger: Arc::new(PostgresTransactionLedger::new(pool.clone())),
            accounts: Arc::new(PostgresAccountRepository::new(pool)),
            gateway: Arc::new(gateway),
            notifier,
        },
        BillingSettings {
            key_id: config.payment.key_id.clone(),
            key_secret: config.payment.key_secret.clone(),
            webhook_secret: config.payment.webhook_secret(),
            lookup_retry: config.payment.retry_policy(),
        },
    );

    let validator: AuthState = Arc::new(JwtSessionValidator::new(&config.auth.jwt_config()));
    let http = HttpSettings {
        request_timeout: config.server.request_timeout(),
        cors_origins: config.server.cors_origins_list(),
    };
    let app = app_router(state, validator, &http);

    let listener = tokio::net::TcpListener::bind(config.server.socket_addr()?).await?;
    info!("Bizhub listening at {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(server.log_level.as_str()));

    let registry = tracing_subscriber::registry().with(filter);
    if server.is_production() {
        registry.with(fmt::layer().json().with_current_span(true)).init();
    } else {
        registry.with(fmt::layer().with_target(true)).init();
    }
}
