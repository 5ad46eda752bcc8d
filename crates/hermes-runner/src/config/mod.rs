// Hermes relayer configuration model
//
// Every record derives `Default` as its zero value, which is what `Config::parse`
// falls back to for missing keys. The relayer defaults live in `Config::new`
// and `Config::add_chain`.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::error::{Error, Result};

pub mod codec;
pub mod duration;

pub use codec::config_path;

/// Defaults applied to every chain added through `Config::add_chain`
pub mod default {
    use std::time::Duration;

    pub const EVENT_BATCH_DELAY: Duration = Duration::from_millis(500);
    pub const RPC_TIMEOUT: Duration = Duration::from_secs(15);
    pub const ACCOUNT_PREFIX: &str = "cosmos";
    pub const KEY_NAME: &str = "wallet";
    pub const STORE_PREFIX: &str = "ibc";
    pub const DEFAULT_GAS: u64 = 100_000;
    pub const MAX_GAS: u64 = 10_000_000;
    pub const GAS_PRICE: f64 = 0.01;
    pub const GAS_DENOM: &str = "stake";
    pub const GAS_MULTIPLIER: f64 = 1.1;
    pub const MAX_MSG_NUM: usize = 30;
    pub const MAX_TX_SIZE: usize = 2_097_152;
    pub const CLOCK_DRIFT: Duration = Duration::from_secs(5);
    pub const MAX_BLOCK_TIME: Duration = Duration::from_secs(10);
    /// 14 days
    pub const TRUSTING_PERIOD: Duration = Duration::from_secs(14 * 24 * 60 * 60);
    pub const TRUST_NUMERATOR: &str = "1";
    pub const TRUST_DENOMINATOR: &str = "3";
    pub const ADDRESS_DERIVATION: &str = "cosmos";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Chains in insertion order
    pub chains: Vec<ChainConfig>,
    pub global: GlobalConfig,
    pub telemetry: TelemetryConfig,
    pub mode: ModeConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub id: String,
    pub rpc_addr: String,
    pub grpc_addr: String,
    #[serde(with = "duration")]
    pub rpc_timeout: Duration,
    /// Bech32 prefix of relayer account addresses
    pub account_prefix: String,
    /// Name of the key Hermes signs with on this chain
    pub key_name: String,
    pub store_prefix: String,
    pub default_gas: u64,
    pub max_gas: u64,
    pub gas_multiplier: f64,
    pub max_msg_num: usize,
    /// Maximum transaction size in bytes
    pub max_tx_size: usize,
    #[serde(with = "duration")]
    pub clock_drift: Duration,
    #[serde(with = "duration")]
    pub max_block_time: Duration,
    #[serde(with = "duration")]
    pub trusting_period: Duration,
    pub event_source: EventSource,
    pub gas_price: GasPrice,
    pub trust_threshold: TrustThreshold,
    pub address_type: AddressType,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSourceMode {
    /// Subscribe to the node's websocket
    #[default]
    Push,
    /// Poll the node for new blocks
    Pull,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventSource {
    pub mode: EventSourceMode,
    pub url: String,
    #[serde(with = "duration")]
    pub batch_delay: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GasPrice {
    pub denom: String,
    pub price: f64,
}

/// Light client trust threshold, kept as text so `1/3` never drifts through a float
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustThreshold {
    pub numerator: String,
    pub denominator: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddressType {
    pub derivation: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// One of the tracing levels: trace, debug, info, warn, error
    pub log_level: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeConfig {
    pub channels: ChannelsMode,
    pub clients: ClientsMode,
    pub connections: ConnectionsMode,
    pub packets: PacketsMode,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelsMode {
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientsMode {
    pub enabled: bool,
    pub misbehaviour: bool,
    pub refresh: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionsMode {
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacketsMode {
    pub enabled: bool,
    /// Blocks between pending packet sweeps; 0 disables periodic clearing
    pub clear_interval: u64,
    pub clear_on_start: bool,
    pub tx_confirmation: bool,
}

/// Override applied to a chain entry after the defaults are filled in
#[derive(Debug, Clone, PartialEq)]
pub enum ChainOption {
    EventSource {
        mode: EventSourceMode,
        url: String,
        batch_delay: Duration,
    },
    RpcTimeout(Duration),
    AccountPrefix(String),
    KeyName(String),
    StorePrefix(String),
    DefaultGas(u64),
    MaxGas(u64),
    GasPrice { price: f64, denom: String },
    GasMultiplier(f64),
    MaxMsgNum(usize),
    MaxTxSize(usize),
    ClockDrift(Duration),
    MaxBlockTime(Duration),
    TrustingPeriod(Duration),
    TrustThreshold { numerator: String, denominator: String },
    AddressType(String),
}

impl ChainOption {
    pub fn apply(self, chain: &mut ChainConfig) {
        match self {
            ChainOption::EventSource { mode, url, batch_delay } => {
                chain.event_source = EventSource { mode, url, batch_delay };
            }
            ChainOption::RpcTimeout(timeout) => chain.rpc_timeout = timeout,
            ChainOption::AccountPrefix(prefix) => chain.account_prefix = prefix,
            ChainOption::KeyName(name) => chain.key_name = name,
            ChainOption::StorePrefix(prefix) => chain.store_prefix = prefix,
            ChainOption::DefaultGas(gas) => chain.default_gas = gas,
            ChainOption::MaxGas(gas) => chain.max_gas = gas,
            ChainOption::GasPrice { price, denom } => chain.gas_price = GasPrice { denom, price },
            ChainOption::GasMultiplier(multiplier) => chain.gas_multiplier = multiplier,
            ChainOption::MaxMsgNum(max) => chain.max_msg_num = max,
            ChainOption::MaxTxSize(size) => chain.max_tx_size = size,
            ChainOption::ClockDrift(drift) => chain.clock_drift = drift,
            ChainOption::MaxBlockTime(max) => chain.max_block_time = max,
            ChainOption::TrustingPeriod(period) => chain.trusting_period = period,
            ChainOption::TrustThreshold { numerator, denominator } => {
                chain.trust_threshold = TrustThreshold { numerator, denominator };
            }
            ChainOption::AddressType(derivation) => {
                chain.address_type = AddressType { derivation };
            }
        }
    }
}

impl Config {
    /// Configuration with no chains and the relayer's default global, telemetry and mode sections
    pub fn new() -> Self {
        Self {
            chains: Vec::new(),
            global: GlobalConfig {
                log_level: "info".to_string(),
            },
            telemetry: TelemetryConfig {
                enabled: true,
                host: "127.0.0.1".to_string(),
                port: 3001,
            },
            mode: ModeConfig {
                channels: ChannelsMode { enabled: true },
                clients: ClientsMode {
                    enabled: true,
                    misbehaviour: true,
                    refresh: true,
                },
                connections: ConnectionsMode { enabled: true },
                packets: PacketsMode {
                    enabled: true,
                    clear_interval: 100,
                    clear_on_start: true,
                    tx_confirmation: true,
                },
            },
        }
    }

    /// Append a chain built from the defaults in [`default`], then `options` in order.
    ///
    /// Fails with `InvalidAddress` if `rpc_addr` is not a URL with a host; the
    /// chain list is left untouched in that case. Duplicate ids are accepted.
    pub fn add_chain<I>(&mut self, id: &str, rpc_addr: &str, grpc_addr: &str, options: I) -> Result<()>
    where
        I: IntoIterator<Item = ChainOption>,
    {
        let event_url = event_source_url(rpc_addr)?;

        let mut chain = ChainConfig {
            id: id.to_string(),
            rpc_addr: rpc_addr.to_string(),
            grpc_addr: grpc_addr.to_string(),
            rpc_timeout: default::RPC_TIMEOUT,
            account_prefix: default::ACCOUNT_PREFIX.to_string(),
            key_name: default::KEY_NAME.to_string(),
            store_prefix: default::STORE_PREFIX.to_string(),
            default_gas: default::DEFAULT_GAS,
            max_gas: default::MAX_GAS,
            gas_multiplier: default::GAS_MULTIPLIER,
            max_msg_num: default::MAX_MSG_NUM,
            max_tx_size: default::MAX_TX_SIZE,
            clock_drift: default::CLOCK_DRIFT,
            max_block_time: default::MAX_BLOCK_TIME,
            trusting_period: default::TRUSTING_PERIOD,
            event_source: EventSource {
                mode: EventSourceMode::Push,
                url: event_url,
                batch_delay: default::EVENT_BATCH_DELAY,
            },
            gas_price: GasPrice {
                denom: default::GAS_DENOM.to_string(),
                price: default::GAS_PRICE,
            },
            trust_threshold: TrustThreshold {
                numerator: default::TRUST_NUMERATOR.to_string(),
                denominator: default::TRUST_DENOMINATOR.to_string(),
            },
            address_type: AddressType {
                derivation: default::ADDRESS_DERIVATION.to_string(),
            },
        };

        for option in options {
            option.apply(&mut chain);
        }

        tracing::debug!("Added chain {} (rpc {})", chain.id, chain.rpc_addr);
        self.chains.push(chain);
        Ok(())
    }

    /// First chain entry with the given id
    pub fn find_chain(&self, id: &str) -> Option<&ChainConfig> {
        self.chains.iter().find(|c| c.id == id)
    }
}

/// Websocket endpoint derived from an RPC address: `ws://<host>[:<port>]/websocket`.
///
/// The port is carried over only when the RPC address spells one out.
pub fn event_source_url(rpc_addr: &str) -> Result<String> {
    // The URL parser silently drops tabs and newlines, so reject them up front
    if rpc_addr.chars().any(char::is_control) {
        return Err(Error::invalid_address(rpc_addr, "contains control characters"));
    }

    let url = Url::parse(rpc_addr).map_err(|e| Error::invalid_address(rpc_addr, e))?;
    let host = url
        .host_str()
        .ok_or_else(|| Error::invalid_address(rpc_addr, "missing host"))?;

    Ok(match url.port() {
        Some(port) => format!("ws://{}:{}/websocket", host, port),
        None => format!("ws://{}/websocket", host),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_sections() {
        let config = Config::new();

        assert!(config.chains.is_empty());
        assert_eq!(config.global.log_level, "info");
        assert!(config.telemetry.enabled);
        assert_eq!(config.telemetry.host, "127.0.0.1");
        assert_eq!(config.telemetry.port, 3001);
        assert!(config.mode.channels.enabled);
        assert!(config.mode.clients.enabled);
        assert!(config.mode.clients.misbehaviour);
        assert!(config.mode.clients.refresh);
        assert!(config.mode.connections.enabled);
        assert!(config.mode.packets.enabled);
        assert_eq!(config.mode.packets.clear_interval, 100);
        assert!(config.mode.packets.clear_on_start);
        assert!(config.mode.packets.tx_confirmation);
    }

    #[test]
    fn test_add_chain_defaults() {
        let mut config = Config::new();
        config
            .add_chain("mars-1", "http://localhost:26657", "http://localhost:9090", [])
            .unwrap();

        let chain = &config.chains[0];
        assert_eq!(chain.id, "mars-1");
        assert_eq!(chain.rpc_addr, "http://localhost:26657");
        assert_eq!(chain.grpc_addr, "http://localhost:9090");
        assert_eq!(chain.event_source.mode, EventSourceMode::Push);
        assert_eq!(chain.event_source.url, "ws://localhost:26657/websocket");
        assert_eq!(chain.event_source.batch_delay, Duration::from_millis(500));
        assert_eq!(chain.rpc_timeout, Duration::from_secs(15));
        assert_eq!(chain.account_prefix, "cosmos");
        assert_eq!(chain.key_name, "wallet");
        assert_eq!(chain.store_prefix, "ibc");
        assert_eq!(chain.default_gas, 100_000);
        assert_eq!(chain.max_gas, 10_000_000);
        assert_eq!(
            chain.gas_price,
            GasPrice { denom: "stake".to_string(), price: 0.01 }
        );
        assert_eq!(chain.gas_multiplier, 1.1);
        assert_eq!(chain.max_msg_num, 30);
        assert_eq!(chain.max_tx_size, 2_097_152);
        assert_eq!(chain.clock_drift, Duration::from_secs(5));
        assert_eq!(chain.max_block_time, Duration::from_secs(10));
        assert_eq!(humantime::format_duration(chain.trusting_period).to_string(), "14days");
        assert_eq!(
            chain.trust_threshold,
            TrustThreshold { numerator: "1".to_string(), denominator: "3".to_string() }
        );
        assert_eq!(chain.address_type.derivation, "cosmos");
    }

    #[test]
    fn test_event_source_url_policy() {
        assert_eq!(
            event_source_url("http://127.0.0.1:26657").unwrap(),
            "ws://127.0.0.1:26657/websocket"
        );
        assert_eq!(
            event_source_url("https://rpc.example.com").unwrap(),
            "ws://rpc.example.com/websocket"
        );
        assert_eq!(
            event_source_url("http://[::1]:26657/").unwrap(),
            "ws://[::1]:26657/websocket"
        );
    }

    #[test]
    fn test_invalid_rpc_address_leaves_config_untouched() {
        let mut config = Config::new();
        config
            .add_chain("mars-1", "http://localhost:26657", "http://localhost:9090", [])
            .unwrap();

        for bad in ["", "localhost:26657:x", "http://local\nhost:26657", "http://\u{7}bell", "unix:/tmp/node.sock"] {
            let result = config.add_chain("venus-1", bad, "http://localhost:9092", []);
            assert!(
                matches!(result, Err(Error::InvalidAddress { .. })),
                "expected InvalidAddress for {:?}",
                bad
            );
        }

        assert_eq!(config.chains.len(), 1);
    }

    #[test]
    fn test_overrides_last_write_wins() {
        let mut config = Config::new();
        config
            .add_chain(
                "venus-1",
                "http://localhost:26659",
                "http://localhost:9092",
                [
                    ChainOption::KeyName("relayer".to_string()),
                    ChainOption::MaxGas(4_000_000),
                    ChainOption::KeyName("venus-key".to_string()),
                ],
            )
            .unwrap();

        let chain = &config.chains[0];
        assert_eq!(chain.key_name, "venus-key");
        assert_eq!(chain.max_gas, 4_000_000);
    }

    #[test]
    fn test_disjoint_overrides_are_order_independent() {
        let options = vec![
            ChainOption::AccountPrefix("osmo".to_string()),
            ChainOption::GasPrice { price: 0.025, denom: "uosmo".to_string() },
            ChainOption::TrustThreshold { numerator: "2".to_string(), denominator: "3".to_string() },
            ChainOption::EventSource {
                mode: EventSourceMode::Pull,
                url: "ws://node:26657/websocket".to_string(),
                batch_delay: Duration::from_millis(200),
            },
        ];
        let mut reversed = options.clone();
        reversed.reverse();

        let mut forward = Config::new();
        forward.add_chain("osmo-1", "http://node:26657", "http://node:9090", options).unwrap();
        let mut backward = Config::new();
        backward.add_chain("osmo-1", "http://node:26657", "http://node:9090", reversed).unwrap();

        assert_eq!(forward.chains, backward.chains);
        assert_eq!(forward.chains[0].event_source.mode, EventSourceMode::Pull);
        assert_eq!(forward.chains[0].gas_price.denom, "uosmo");
    }

    #[test]
    fn test_duplicate_chain_ids_are_kept_in_order() {
        let mut config = Config::new();
        config.add_chain("mars-1", "http://a:1", "http://a:2", []).unwrap();
        config.add_chain("mars-1", "http://b:1", "http://b:2", []).unwrap();

        assert_eq!(config.chains.len(), 2);
        assert_eq!(config.find_chain("mars-1").unwrap().rpc_addr, "http://a:1");
        assert!(config.find_chain("venus-1").is_none());
    }
}
