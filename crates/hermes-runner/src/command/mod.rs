// Hermes command line construction
//
// An `Invocation` is a command, an optional subcommand and a set of flags. It
// encodes to `<hermes> <command> [<subcommand>] --flag[=value]...`.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Flag names understood by the Hermes CLI
pub mod flag {
    pub const HOST_CHAIN: &str = "host-chain";
    pub const REFERENCE_CHAIN: &str = "reference-chain";
    pub const CHAIN_A: &str = "a-chain";
    pub const CHAIN_B: &str = "b-chain";
    pub const CLIENT_A: &str = "a-client";
    pub const CLIENT_B: &str = "b-client";
    pub const CONNECTION_A: &str = "a-connection";
    pub const CONNECTION_B: &str = "b-connection";
    pub const PORT_A: &str = "a-port";
    pub const PORT_B: &str = "b-port";
    pub const SHOW_COUNTERPARTY: &str = "show-counterparty";
    pub const CHAIN: &str = "chain";
    pub const MNEMONIC_FILE: &str = "mnemonic-file";
}

/// Top level Hermes command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Create,
    Query,
    Keys,
    Start,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Create => "create",
            Command::Query => "query",
            Command::Keys => "keys",
            Command::Start => "start",
        }
    }
}

/// Subcommand following a [`Command`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubCommand {
    Client,
    Connection,
    Channel,
    Channels,
    Add,
}

impl SubCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubCommand::Client => "client",
            SubCommand::Connection => "connection",
            SubCommand::Channel => "channel",
            SubCommand::Channels => "channels",
            SubCommand::Add => "add",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for SubCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagValue {
    /// Presence flag: `--name` when true, omitted when false
    Bool(bool),
    /// `--name=value`
    Text(String),
    /// `--name=<path>`, passed through byte for byte
    Path(PathBuf),
}

impl From<bool> for FlagValue {
    fn from(value: bool) -> Self {
        FlagValue::Bool(value)
    }
}

impl From<String> for FlagValue {
    fn from(value: String) -> Self {
        FlagValue::Text(value)
    }
}

impl From<&str> for FlagValue {
    fn from(value: &str) -> Self {
        FlagValue::Text(value.to_string())
    }
}

impl From<&Path> for FlagValue {
    fn from(value: &Path) -> Self {
        FlagValue::Path(value.to_path_buf())
    }
}

impl From<PathBuf> for FlagValue {
    fn from(value: PathBuf) -> Self {
        FlagValue::Path(value)
    }
}

impl TryFrom<serde_json::Value> for FlagValue {
    type Error = serde_json::Value;

    /// Booleans, strings and numbers are accepted; anything else is handed back
    fn try_from(value: serde_json::Value) -> std::result::Result<Self, Self::Error> {
        match value {
            serde_json::Value::Bool(b) => Ok(FlagValue::Bool(b)),
            serde_json::Value::String(s) => Ok(FlagValue::Text(s)),
            serde_json::Value::Number(n) => Ok(FlagValue::Text(n.to_string())),
            other => Err(other),
        }
    }
}

/// Flags for one invocation, kept sorted by name so encoding is deterministic
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Flags(BTreeMap<String, FlagValue>);

impl Flags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder style insert
    pub fn with(mut self, name: &str, value: impl Into<FlagValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or replace a flag
    pub fn insert(&mut self, name: &str, value: impl Into<FlagValue>) {
        self.0.insert(name.to_string(), value.into());
    }

    /// Insert a loosely typed value, rejecting anything that has no flag encoding
    pub fn insert_value(&mut self, name: &str, value: serde_json::Value) -> Result<()> {
        let value = FlagValue::try_from(value).map_err(|rejected| Error::UnsupportedFlagType {
            flag: name.to_string(),
            value: rejected.to_string(),
        })?;
        self.0.insert(name.to_string(), value);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&FlagValue> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Encoded `--flag` / `--flag=value` tokens, false booleans dropped
    pub fn to_args(&self) -> Vec<OsString> {
        self.0
            .iter()
            .filter_map(|(name, value)| match value {
                FlagValue::Bool(true) => Some(OsString::from(format!("--{}", name))),
                FlagValue::Bool(false) => None,
                FlagValue::Text(text) => Some(OsString::from(format!("--{}={}", name, text))),
                FlagValue::Path(path) => {
                    let mut arg = OsString::from(format!("--{}=", name));
                    arg.push(path);
                    Some(arg)
                }
            })
            .collect()
    }
}

/// A fully specified Hermes call
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub command: Command,
    pub sub_command: Option<SubCommand>,
    pub flags: Flags,
}

impl Invocation {
    pub fn new(command: Command, sub_command: Option<SubCommand>, flags: Flags) -> Self {
        Self {
            command,
            sub_command,
            flags,
        }
    }

    /// `keys --chain --mnemonic-file`
    pub fn add_key(chain_id: &str, key_file: &Path) -> Self {
        Self::new(
            Command::Keys,
            None,
            Flags::new()
                .with(flag::CHAIN, chain_id)
                .with(flag::MNEMONIC_FILE, key_file),
        )
    }

    /// `keys add --chain --mnemonic-file`
    pub fn add_mnemonic(chain_id: &str, mnemonic_file: &Path) -> Self {
        Self::new(
            Command::Keys,
            Some(SubCommand::Add),
            Flags::new()
                .with(flag::CHAIN, chain_id)
                .with(flag::MNEMONIC_FILE, mnemonic_file),
        )
    }

    pub fn create_client(host_chain: &str, reference_chain: &str) -> Self {
        Self::new(
            Command::Create,
            Some(SubCommand::Client),
            Flags::new()
                .with(flag::HOST_CHAIN, host_chain)
                .with(flag::REFERENCE_CHAIN, reference_chain),
        )
    }

    pub fn create_connection(chain_a: &str, client_a: &str, client_b: &str) -> Self {
        Self::new(
            Command::Create,
            Some(SubCommand::Connection),
            Flags::new()
                .with(flag::CHAIN_A, chain_a)
                .with(flag::CLIENT_A, client_a)
                .with(flag::CLIENT_B, client_b),
        )
    }

    pub fn create_channel(chain_a: &str, connection_a: &str, port_a: &str, port_b: &str) -> Self {
        Self::new(
            Command::Create,
            Some(SubCommand::Channel),
            Flags::new()
                .with(flag::CHAIN_A, chain_a)
                .with(flag::CONNECTION_A, connection_a)
                .with(flag::PORT_A, port_a)
                .with(flag::PORT_B, port_b),
        )
    }

    pub fn query_channels(show_counterparty: bool, chain: &str) -> Self {
        let mut flags = Flags::new().with(flag::CHAIN, chain);
        if show_counterparty {
            flags.insert(flag::SHOW_COUNTERPARTY, true);
        }
        Self::new(Command::Query, Some(SubCommand::Channels), flags)
    }

    pub fn start(flags: Flags) -> Self {
        Self::new(Command::Start, None, flags)
    }

    /// Full argument vector, program first
    pub fn argv(&self, program: &Path) -> Vec<OsString> {
        let mut argv = vec![program.as_os_str().to_os_string(), self.command.as_str().into()];
        if let Some(sub_command) = self.sub_command {
            argv.push(sub_command.as_str().into());
        }
        argv.extend(self.flags.to_args());
        argv
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command)?;
        if let Some(sub_command) = self.sub_command {
            write!(f, " {}", sub_command)?;
        }
        Ok(())
    }
}
