use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use hermes_runner::{config_path, ChainOption, Config, Hermes};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "hermes-runner")]
#[command(about = "Configure and drive the Hermes IBC relayer")]
#[command(version)]
pub struct Cli {
    /// Hermes executable to run (defaults to the bundled build)
    #[arg(long, global = true)]
    pub hermes_bin: Option<PathBuf>,

    /// Configuration file path (defaults to ~/.hermes/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write or inspect the relayer configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Manage relayer keys
    #[command(subcommand)]
    Keys(KeysCommand),
    /// Create IBC clients, connections and channels
    #[command(subcommand)]
    Create(CreateCommand),
    /// Query chain state through Hermes
    #[command(subcommand)]
    Query(QueryCommand),
    /// Start relaying
    Start,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Write a fresh configuration with the given chains
    Init(InitArgs),
    /// Print the configuration file
    Show,
}

#[derive(Args)]
pub struct InitArgs {
    /// Chain as `<id>=<rpc>,<grpc>`, repeatable
    #[arg(long = "chain", required = true, value_parser = parse_chain_arg)]
    pub chains: Vec<ChainArg>,
    /// Bech32 account prefix for every chain
    #[arg(long)]
    pub account_prefix: Option<String>,
    /// Signing key name for every chain
    #[arg(long)]
    pub key_name: Option<String>,
    /// Fee denom for every chain
    #[arg(long, requires = "gas_price")]
    pub denom: Option<String>,
    /// Gas price for every chain
    #[arg(long, requires = "denom")]
    pub gas_price: Option<f64>,
}

#[derive(Clone, Debug)]
pub struct ChainArg {
    pub id: String,
    pub rpc_addr: String,
    pub grpc_addr: String,
}

fn parse_chain_arg(raw: &str) -> Result<ChainArg, String> {
    let (id, addrs) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected <id>=<rpc>,<grpc>, got '{}'", raw))?;
    let (rpc_addr, grpc_addr) = addrs
        .split_once(',')
        .ok_or_else(|| format!("expected <rpc>,<grpc> after '{}='", id))?;

    Ok(ChainArg {
        id: id.trim().to_string(),
        rpc_addr: rpc_addr.trim().to_string(),
        grpc_addr: grpc_addr.trim().to_string(),
    })
}

#[derive(Subcommand)]
pub enum KeysCommand {
    /// Add a key from a mnemonic phrase or file
    Add {
        #[arg(long)]
        chain: String,
        /// Mnemonic words
        #[arg(long, conflicts_with = "mnemonic_file", required_unless_present = "mnemonic_file")]
        mnemonic: Option<String>,
        /// File holding the mnemonic
        #[arg(long)]
        mnemonic_file: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum CreateCommand {
    Client {
        #[arg(long)]
        host_chain: String,
        #[arg(long)]
        reference_chain: String,
    },
    Connection {
        #[arg(long)]
        a_chain: String,
        #[arg(long)]
        a_client: String,
        #[arg(long)]
        b_client: String,
    },
    Channel {
        #[arg(long)]
        a_chain: String,
        #[arg(long)]
        a_connection: String,
        #[arg(long)]
        a_port: String,
        #[arg(long)]
        b_port: String,
    },
}

#[derive(Subcommand)]
pub enum QueryCommand {
    Channels {
        #[arg(long)]
        chain: String,
        #[arg(long)]
        show_counterparty: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("hermes_runner={}", cli.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config_file = match cli.config {
        Some(path) => Ok(path),
        None => config_path(),
    };

    match cli.command {
        Commands::Config(ConfigCommand::Init(args)) => init_config(&config_file?, args),
        Commands::Config(ConfigCommand::Show) => {
            let config_file = config_file?;
            let config = Config::load(&config_file)
                .with_context(|| format!("reading {}", config_file.display()))?;
            print!("{}", config.to_toml()?);
            Ok(())
        }
        command => {
            let mut hermes = match cli.hermes_bin {
                Some(path) => Hermes::from_executable(path),
                None => Hermes::acquire().context("no --hermes-bin given and no bundled Hermes")?,
            };
            let outcome = run_hermes(&mut hermes, command).await;
            hermes.release()?;
            outcome
        }
    }
}

fn init_config(path: &Path, args: InitArgs) -> anyhow::Result<()> {
    let mut options = Vec::new();
    if let Some(prefix) = args.account_prefix {
        options.push(ChainOption::AccountPrefix(prefix));
    }
    if let Some(name) = args.key_name {
        options.push(ChainOption::KeyName(name));
    }
    if let (Some(denom), Some(price)) = (args.denom, args.gas_price) {
        options.push(ChainOption::GasPrice { price, denom });
    }

    let mut config = Config::new();
    for chain in &args.chains {
        config
            .add_chain(&chain.id, &chain.rpc_addr, &chain.grpc_addr, options.clone())
            .with_context(|| format!("adding chain {}", chain.id))?;
    }
    config.save_to(path)?;

    info!("Wrote {} with {} chain(s)", path.display(), config.chains.len());
    Ok(())
}

async fn run_hermes(hermes: &mut Hermes, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Keys(KeysCommand::Add { chain, mnemonic, mnemonic_file }) => {
            match (mnemonic, mnemonic_file) {
                (Some(words), _) => hermes.add_mnemonic(&chain, &words).await?,
                (None, Some(file)) => hermes.add_key(&chain, &file).await?,
                (None, None) => anyhow::bail!("either --mnemonic or --mnemonic-file is required"),
            }
        }
        Commands::Create(CreateCommand::Client { host_chain, reference_chain }) => {
            hermes.create_client(&host_chain, &reference_chain).await?
        }
        Commands::Create(CreateCommand::Connection { a_chain, a_client, b_client }) => {
            hermes.create_connection(&a_chain, &a_client, &b_client).await?
        }
        Commands::Create(CreateCommand::Channel { a_chain, a_connection, a_port, b_port }) => {
            hermes.create_channel(&a_chain, &a_connection, &a_port, &b_port).await?
        }
        Commands::Query(QueryCommand::Channels { chain, show_counterparty }) => {
            hermes.query_channels(show_counterparty, &chain).await?
        }
        Commands::Start => hermes.start().await?,
        Commands::Config(_) => anyhow::bail!("config commands do not run Hermes"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chain_arg() {
        let chain = parse_chain_arg("mars-1=http://localhost:26657, http://localhost:9090").unwrap();
        assert_eq!(chain.id, "mars-1");
        assert_eq!(chain.rpc_addr, "http://localhost:26657");
        assert_eq!(chain.grpc_addr, "http://localhost:9090");

        assert!(parse_chain_arg("mars-1").is_err());
        assert!(parse_chain_arg("mars-1=http://localhost:26657").is_err());
    }

    #[test]
    fn test_cli_parses_create_channel() {
        let cli = Cli::try_parse_from([
            "hermes-runner",
            "--hermes-bin",
            "/usr/local/bin/hermes",
            "create",
            "channel",
            "--a-chain",
            "mars-1",
            "--a-connection",
            "connection-0",
            "--a-port",
            "transfer",
            "--b-port",
            "transfer",
        ])
        .unwrap();

        assert_eq!(cli.hermes_bin, Some(PathBuf::from("/usr/local/bin/hermes")));
        assert!(matches!(
            cli.command,
            Commands::Create(CreateCommand::Channel { ref a_connection, .. }) if a_connection == "connection-0"
        ));
    }

    #[test]
    fn test_keys_add_needs_a_mnemonic_source() {
        assert!(Cli::try_parse_from(["hermes-runner", "keys", "add", "--chain", "mars-1"]).is_err());
    }

    #[tokio::test]
    async fn test_config_command_is_not_sent_to_hermes() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut hermes = Hermes::from_executable(temp_dir.path().join("hermes"));

        let result = run_hermes(&mut hermes, Commands::Config(ConfigCommand::Show)).await;
        assert!(result.unwrap_err().to_string().contains("do not run Hermes"));
    }

    #[test]
    fn test_init_writes_config_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        let cli = Cli::try_parse_from([
            "hermes-runner",
            "config",
            "init",
            "--chain",
            "mars-1=http://localhost:26649,http://localhost:9082",
            "--chain",
            "venus-1=http://localhost:26659,http://localhost:9092",
            "--key-name",
            "relayer",
        ])
        .unwrap();

        let Commands::Config(ConfigCommand::Init(args)) = cli.command else {
            panic!("expected config init");
        };
        init_config(&path, args).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.chains.len(), 2);
        assert!(config.chains.iter().all(|c| c.key_name == "relayer"));
    }
}
