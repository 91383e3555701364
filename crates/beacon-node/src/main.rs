mod config;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use beacon_crypto::{
    HashVrfVerifier, KeyPair, Secp256k1Extractor, Signer, VerifyExtractor, VrfKeypair, VrfSigner, VrfVerifier,
};
use clap::{Parser, Subcommand};
use config::Config;
use tortoise_beacon::driver::RoundDriverDeps;
use tortoise_beacon::engine::{TortoiseBeacon, TortoiseBeaconConfig};
use tortoise_beacon::interfaces::{AtxHeader, Broadcaster};
use tortoise_beacon::store::BeaconStore;
use tortoise_beacon::testing::{AlwaysSynced, IntervalLayerClock, RecordingBroadcaster, StaticActivationDb};
use tortoise_beacon::validator::MessageValidator;
use tortoise_beacon::weak_coin::DeterministicWeakCoin;
use tracing::info;

#[derive(Parser)]
#[clap(name = "beacon-node")]
#[clap(author, version, about = "Tortoise beacon demo node", long_about = None)]
struct Cli {
    #[clap(short, long, value_name = "FILE", default_value = "config.toml")]
    config: String,

    #[clap(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the node
    Start,
    /// Write a default configuration file
    Init {
        #[clap(short, long, default_value = "config.toml")]
        output: String,
    },
    /// Print version information
    Version,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Init { output }) => {
            Config::default().to_file(&output)?;
            println!("configuration written to {output}");
        }
        Some(Commands::Version) => {
            println!("beacon-node {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Start) | None => start_node(&cli.config).await?,
    }

    Ok(())
}

async fn start_node(config_path: &str) -> Result<()> {
    let config = if std::path::Path::new(config_path).exists() {
        Config::from_file(config_path)?
    } else {
        Config::default()
    };

    init_logging(&config.logging.level);
    info!(node = %config.node.name, "starting beacon node");

    let keys = Arc::new(KeyPair::generate());
    let vrf = Arc::new(VrfKeypair::from_seed(&[0x42u8; 32]));
    let node_id = beacon_core::NodeId::new(keys.public_key_bytes());

    let atx_id = node_id.as_bytes().to_vec();
    let header = AtxHeader { node_id: node_id.clone(), vrf_pub_key: vrf.vrf_public_key(), num_units: 10_000 };
    let activation_db = Arc::new(StaticActivationDb::new(10_000, vec![(atx_id, header)]));

    let validator = Arc::new(MessageValidator::new(
        Arc::new(Secp256k1Extractor) as Arc<dyn VerifyExtractor>,
        Arc::new(HashVrfVerifier) as Arc<dyn VrfVerifier>,
    ));

    let driver_deps = RoundDriverDeps {
        config: Arc::new(config.protocol.clone()),
        node_id,
        signer: keys as Arc<dyn Signer>,
        vrf_signer: vrf as Arc<dyn VrfSigner>,
        broadcaster: Arc::new(RecordingBroadcaster::new()) as Arc<dyn Broadcaster>,
        weak_coin: Arc::new(DeterministicWeakCoin::new([0x24u8; 32])),
        validator,
    };

    let mirror = match &config.storage.db_path {
        Some(path) => Some(Box::new(beacon_storage::BeaconRocksDb::open(path)?) as Box<dyn tortoise_beacon::interfaces::TortoiseBeaconDb>),
        None => None,
    };
    let beacon_store = Arc::new(BeaconStore::new(config.node.genesis_epochs, mirror));

    let layer_clock = Arc::new(IntervalLayerClock::new(Duration::from_millis(config.node.layer_duration_ms)));

    let engine_config = TortoiseBeaconConfig {
        layers_per_epoch: config.node.layers_per_epoch,
        genesis_epochs: config.node.genesis_epochs,
    };

    let engine = TortoiseBeacon::new(engine_config, driver_deps, activation_db, layer_clock, beacon_store);
    engine.set_sync_state(Arc::new(AlwaysSynced));
    engine.start()?;

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    engine.close().await;
    Ok(())
}

fn init_logging(level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(env_filter).with_target(false).init();
}
