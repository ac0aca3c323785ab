//! Contains the courier CLI.

use anyhow::Result;
use clap::Parser;
use courier_core::Config;
use courier_service::{HttpAttestationClient, RpcBlockSource, RpcDestinationClient, Service};
use courier_storage::JsonFileStore;
use std::{collections::HashMap, path::PathBuf, sync::Arc};
use tracing::{error, info};

/// The fully wired production service.
type RelayService =
    Service<JsonFileStore, RpcBlockSource, RpcDestinationClient, HttpAttestationClient>;

/// CLI for the courier cross-chain message relayer.
#[derive(Parser, Debug)]
#[command(name = "courier", about = "Attested cross-chain message relayer", version)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, short = 'c', env = "COURIER_CONFIG", default_value = "courier.toml")]
    pub config: PathBuf,
}

impl Cli {
    /// Runs the CLI.
    pub fn run(self) -> Result<()> {
        Self::init_logs()?;

        Self::run_until_ctrl_c(async move {
            let config = Config::load(&self.config)?;
            let mut service = build_service(config)?;
            service.initialise()?;

            tokio::select! {
                res = service.run() => {
                    if let Err(err) = res {
                        error!(target: "courier", %err, "Error running relayer service");
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!(target: "courier", "Ctrl+C received, initiating service shutdown...");
                }
            }

            service.shutdown().await?;
            info!(target: "courier", "Relayer shut down gracefully.");
            Ok(())
        })
    }

    /// Run until ctrl-c is pressed.
    pub fn run_until_ctrl_c<F>(fut: F) -> Result<()>
    where
        F: std::future::Future<Output = Result<()>>,
    {
        let rt = Self::tokio_runtime().map_err(|e| anyhow::anyhow!(e))?;
        rt.block_on(fut)
    }

    /// Creates a new default tokio multi-thread [`Runtime`](tokio::runtime::Runtime) with all
    /// features enabled
    pub fn tokio_runtime() -> Result<tokio::runtime::Runtime, std::io::Error> {
        tokio::runtime::Builder::new_multi_thread().enable_all().build()
    }

    /// Initializes the telemetry stack.
    fn init_logs() -> Result<()> {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .init();
        Ok(())
    }
}

/// Builds the production service from the parsed configuration: a JSON file
/// checkpoint store, one RPC source per observed chain, one signing RPC
/// client per destination chain and the HTTP attestation client.
fn build_service(config: Config) -> Result<RelayService> {
    let store = Arc::new(JsonFileStore::new(&config.storage_dir)?);

    let mut sources = HashMap::new();
    for source in &config.source_chains {
        let contracts: Vec<_> = source.message_contracts.keys().copied().collect();
        sources.insert(
            source.chain_id,
            Arc::new(RpcBlockSource::new(source.chain_id, source.rpc_url.clone(), contracts)),
        );
    }

    let mut destinations = HashMap::new();
    for destination in &config.destination_chains {
        let client = RpcDestinationClient::new(
            destination.chain_id,
            destination.rpc_url.clone(),
            destination.gateway_address,
            &destination.account_private_key,
        )?;
        destinations.insert(destination.chain_id, Arc::new(client));
    }

    let attestor = Arc::new(HttpAttestationClient::new(config.attestation_url.clone()));
    Ok(Service::new(config, store, sources, destinations, attestor))
}
