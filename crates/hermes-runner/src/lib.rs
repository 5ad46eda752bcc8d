// Hermes relayer driver library
// Builds Hermes configurations and runs the Hermes binary to wire up IBC clients, connections and channels

pub mod command;
pub mod config;
pub mod error;
pub mod process;

// Re-export commonly used types for convenience
pub use command::{Command, FlagValue, Flags, Invocation, SubCommand};
pub use config::{config_path, ChainConfig, ChainOption, Config, EventSourceMode};
pub use error::{Error, Result};
pub use process::{Hermes, OutputSink};
