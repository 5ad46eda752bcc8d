// Example: relay between two local chains
// Writes ~/.hermes/config.toml for mars-1 and venus-1, imports keys, and opens a transfer channel
//
// Usage: cargo run --example two_chain_setup -- /path/to/hermes

use hermes_runner::{ChainOption, Config, Hermes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut hermes = match std::env::args().nth(1) {
        Some(path) => Hermes::from_executable(path),
        None => Hermes::acquire()?,
    };

    // Create the default config and add chains
    let mut config = Config::new();
    config.add_chain("mars-1", "http://localhost:26649", "http://localhost:9082", [])?;
    config.add_chain(
        "venus-1",
        "http://localhost:26659",
        "http://localhost:9092",
        [ChainOption::KeyName("venus-relayer".to_string())],
    )?;
    let path = config.save()?;
    println!("Config written to {}", path.display());

    let outcome = setup(&mut hermes).await;
    hermes.release()?;
    outcome
}

async fn setup(hermes: &mut Hermes) -> anyhow::Result<()> {
    hermes
        .add_mnemonic(
            "mars-1",
            "letter column benefit acoustic evidence false trim cave jump pluck awesome lion",
        )
        .await?;
    hermes
        .add_mnemonic(
            "venus-1",
            "jeans payment lock client result enemy bullet rug crush deny month salad",
        )
        .await?;

    hermes.create_client("mars-1", "venus-1").await?;
    hermes.create_client("venus-1", "mars-1").await?;
    hermes
        .create_connection("mars-1", "07-tendermint-0", "07-tendermint-0")
        .await?;
    hermes
        .create_channel("mars-1", "connection-0", "transfer", "transfer")
        .await?;
    hermes.query_channels(true, "mars-1").await?;

    // Runs until Hermes is stopped
    hermes.start().await?;
    Ok(())
}
