//! CLI for msgbroker
//!
//! Subcommands:
//! - `server`: run the broker until Ctrl-C
//! - `client`: publish, subscribe or ping against a running broker

use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use msgbroker::broker::Broker;
use msgbroker::client::Client;
use msgbroker::config::{Settings, load_config};
use msgbroker::connection::ConnectionRegistry;
use msgbroker::transport::start_broker_server;
use msgbroker::utils::logging;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "msgbroker", about = "Minimal TCP publish/subscribe broker")]
struct Cli {
    /// error, warn, info, debug or trace
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the broker
    Server,
    /// Publish to, subscribe to or ping a running broker
    Client {
        /// Broker to talk to (default: the configured server address)
        #[arg(long, num_args = 2, value_names = ["HOST", "PORT"])]
        address: Option<Vec<String>>,

        /// Topic followed by the values to publish to it
        #[arg(long, num_args = 2.., value_names = ["TOPIC", "ARGS"])]
        publish: Option<Vec<String>>,

        /// Topics to fetch every stored message of
        #[arg(long, num_args = 1.., value_name = "TOPIC")]
        subscribe: Vec<String>,

        /// Send a single liveness probe
        #[arg(long)]
        ping: bool,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let level = logging::init(&cli.log_level);
    info!("Logging at {}", level);

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Server => run_server(config).await,
        Command::Client {
            address,
            publish,
            subscribe,
            ping,
        } => run_client(config, address, publish, subscribe, ping).await,
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run_server(config: Settings) -> Result<(), Box<dyn Error>> {
    let broker = Arc::new(Broker::new());
    let registry = ConnectionRegistry::new();

    tokio::select! {
        result = start_broker_server(config.server.address(), broker, registry.clone(), config.heartbeat.clone()) => {
            result?;
            error!("Broker exited unexpectedly.");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
            registry.disconnect_all().await;
        }
    }

    Ok(())
}

async fn run_client(
    config: Settings,
    address: Option<Vec<String>>,
    publish: Option<Vec<String>>,
    subscribe: Vec<String>,
    ping: bool,
) -> Result<(), Box<dyn Error>> {
    let target = match address.as_deref() {
        Some([host, port]) => format!("{}:{}", host, port),
        _ => config.server.address(),
    };
    let server = resolve(&target).await?;
    let heartbeat = config.heartbeat.enabled;
    let client = Client::new(server, config);

    let responder = if heartbeat {
        Some(tokio::spawn(client.pong_responder().await?.run()))
    } else {
        None
    };
    let pinger = if heartbeat {
        Some(client.spawn_pinger().await?)
    } else {
        None
    };

    if ping {
        match client.ping().await {
            Ok(rtt) => println!("PONG from {} in {:?}", server, rtt),
            Err(e) => warn!("Ping failed: {}", e),
        }
    }

    let publishing = async {
        match publish.as_deref() {
            Some([topic, values @ ..]) => client.publish(topic, values).await,
            _ => Ok(()),
        }
    };
    let subscribing = async {
        for (topic, result) in client.subscribe(&subscribe).await {
            match result {
                Ok(deliveries) => {
                    for delivery in deliveries {
                        println!("     <topic> {} : <message> {}", delivery.topic, delivery.message);
                    }
                }
                Err(e) => warn!("Subscribe to '{}' failed: {}", topic, e),
            }
        }
    };
    let (published, ()) = tokio::join!(publishing, subscribing);

    if let Some(pinger) = pinger {
        let outcome = pinger.await?;
        info!("Pinger finished: {:?}", outcome);
    }
    if let Some(responder) = responder {
        responder.await?;
    }

    published?;
    Ok(())
}

async fn resolve(target: &str) -> Result<SocketAddr, Box<dyn Error>> {
    tokio::net::lookup_host(target)
        .await?
        .next()
        .ok_or_else(|| format!("cannot resolve {}", target).into())
}
