//! Chain strings, chain setup files and engine settings for catena.
//!
//! # Features
//!
//! - **Chain strings**: parse `-ea:120 -kos:1,0,100,0.5,0 -efl:4000` into a
//!   live [`Chain`](catena_core::Chain), and print it back with `Display`
//! - **Presets**: `-pn:name` and `-pf:path` clauses expand preset
//!   definitions into a single operator; [`load_presets`] reads a library
//! - **Chain setups**: named sets of chains with shared settings, stored as
//!   TOML or as one `-a:<name> <chain string>` line per chain
//! - **Engine settings**: sample rate, block size and output width with
//!   serde defaults
//!
//! # Example
//!
//! ```rust
//! use catena_config::{ChainDefinition, ChainSetup, parse_chain};
//! use catena_registry::Registry;
//!
//! let registry = Registry::new();
//! let chain = parse_chain("-ea:120 -kos:1,0,100,0.5,0", &registry).unwrap();
//! assert_eq!(chain.to_string(), "-ea:120 -kos:1,0,100,0.5,0");
//!
//! let setup = ChainSetup::new("vocal")
//!     .with_chain(ChainDefinition::new("main", "-ea:120 -efl:4000"));
//! let chains = setup.build(&registry).unwrap();
//! assert_eq!(chains[0].number_of_chain_operators(), 2);
//! ```

mod error;
mod settings;
mod setup;

/// Chain-string grammar, clause parser and chain builder.
pub mod parse;
pub mod preset;

pub use error::{ConfigError, ParseError};
pub use parse::{
    CONTROLLER_MARKER, Clause, build_chain, parse_chain, parse_clauses, parse_named_chain,
};
pub use preset::{
    MAX_PRESET_DEPTH, PRESET_FILE, PRESET_NAMED, load_presets, parse_presets, read_preset_file,
};
pub use settings::{EngineSettings, SUPPORTED_BITS};
pub use setup::{ChainDefinition, ChainSetup};

/// Re-export of the registry every builder here takes.
pub use catena_registry::Registry;
