use std::collections::BTreeMap;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use smarthome_fulfillment::{
    AccessTokenValidator, Config, DeviceState, EchoProvider, FulfillmentServer, HomeGraphClient,
    StateNotifier, StaticTokenValidator, UserInfoValidator,
};

/// Smart home fulfillment endpoint
#[derive(Parser)]
#[command(name = "fulfillment", version, about)]
struct Cli {
    /// Port to listen on (overrides the config file)
    #[arg(long, env = "FULFILLMENT_PORT")]
    port: Option<u16>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Ask HomeGraph to issue a fresh SYNC for a user
    RequestSync {
        /// Agent user id (defaults to `FULFILLMENT_AGENT_USER_ID`)
        #[arg(short, long)]
        user: Option<String>,
    },
    /// Push the state of one device to HomeGraph
    ReportState {
        /// Agent user id (defaults to `FULFILLMENT_AGENT_USER_ID`)
        #[arg(short, long)]
        user: Option<String>,
        /// Device id
        #[arg(short, long)]
        device: String,
        /// State as JSON, e.g. '{"online":true,"on":false}'
        state: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,smarthome_fulfillment=info",
        1 => "info,smarthome_fulfillment=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load()?;
    if let Some(port) = cli.port {
        config.port = port;
    }

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::RequestSync { user } => request_sync(&config, user).await,
            Command::ReportState {
                user,
                device,
                state,
            } => report_state(&config, user, device, &state).await,
        };
    }

    let validator: Arc<dyn AccessTokenValidator> = match &config.userinfo_url {
        Some(url) => {
            tracing::info!(url = %url, "validating tokens against userinfo endpoint");
            Arc::new(UserInfoValidator::new(url.clone()))
        }
        None => {
            if config.access_tokens.is_empty() {
                tracing::warn!("no access tokens configured - every request will be rejected");
            }
            let validator = config
                .access_tokens
                .iter()
                .fold(StaticTokenValidator::new(), |v, (token, user)| {
                    v.with_token(token.clone(), user.clone())
                });
            Arc::new(validator)
        }
    };

    tracing::info!(port = config.port, "starting fulfillment server");
    FulfillmentServer::new(validator, Arc::new(EchoProvider::new()), config.port)
        .run()
        .await?;

    Ok(())
}

fn homegraph(config: &Config) -> anyhow::Result<HomeGraphClient> {
    let path = config
        .homegraph_service_account
        .clone()
        .context("HOMEGRAPH_SERVICE_ACCOUNT is not set")?;
    let client = HomeGraphClient::new(path);
    Ok(match &config.homegraph_url {
        Some(url) => client.with_base_url(url.clone()),
        None => client,
    })
}

fn agent_user_id(config: &Config, user: Option<String>) -> anyhow::Result<String> {
    user.or_else(|| config.agent_user_id.clone())
        .context("no agent user id; pass --user or set FULFILLMENT_AGENT_USER_ID")
}

async fn request_sync(config: &Config, user: Option<String>) -> anyhow::Result<()> {
    let user = agent_user_id(config, user)?;
    homegraph(config)?.request_sync(&user).await?;
    println!("Requested sync for {user}");
    Ok(())
}

async fn report_state(
    config: &Config,
    user: Option<String>,
    device: String,
    state: &str,
) -> anyhow::Result<()> {
    let user = agent_user_id(config, user)?;
    let state: DeviceState = serde_json::from_str(state).context("invalid device state")?;
    let states = BTreeMap::from([(device.clone(), state)]);

    homegraph(config)?.report_state(&user, &states).await?;
    println!("Reported state of {device} for {user}");
    Ok(())
}
