use {
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "padlink", about = "Padlink — phone-as-gamepad relay server")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the relay gateway server.
    Gateway {
        /// Bind address (overrides config).
        #[arg(long)]
        bind: Option<String>,
        /// Port (overrides config).
        #[arg(long)]
        port: Option<u16>,
    },
    /// Query a running gateway's health endpoint.
    Status {
        #[arg(long, default_value = "http://127.0.0.1:3000")]
        url: String,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "padlink starting");

    match cli.command {
        Commands::Gateway { bind, port } => {
            let mut config = padlink_config::discover_and_load();
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            padlink_gateway::server::start_gateway(config).await
        },
        Commands::Status { url } => {
            let health: serde_json::Value =
                reqwest::get(format!("{url}/health")).await?.json().await?;
            println!("{}", serde_json::to_string_pretty(&health)?);
            Ok(())
        },
    }
}
