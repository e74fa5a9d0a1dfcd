//! Chain setup files.
//!
//! A [`ChainSetup`] is a named set of chains plus the [`EngineSettings`]
//! they run with. Each chain is stored as its chain string, so a setup
//! file holds nothing the chain string does not already say.
//!
//! Two on-disk forms are supported, picked by file extension:
//!
//! # TOML (`.toml`)
//!
//! ```toml
//! name = "vocal"
//!
//! [settings]
//! sample_rate = 44100
//! buffer_size = 512
//!
//! [presets]
//! bright = "-efh:%cutoff -ea:110"
//!
//! [[chains]]
//! name = "main"
//! operators = "-ea:120 -kos:1,0,100,0.5,0 -efl:4000"
//! muted = false
//! ```
//!
//! # Text (anything else)
//!
//! One option line and one line per chain; blank lines and lines starting
//! with `#` are skipped:
//!
//! ```text
//! # vocal chain
//! -n:vocal -b:512 -sr:44100 -bits:32
//! -a:main -ea:120 -kos:1,0,100,0.5,0 -efl:4000
//! ```
//!
//! The text form records neither muting nor presets; chains read from it
//! start unmuted and can only use presets the registry already has.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::Path;

use catena_core::Chain;
use catena_registry::Registry;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::parse::parse_named_chain;
use crate::settings::EngineSettings;

const CHAIN_PREFIX: &str = "-a:";

/// One chain of a setup, as text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChainDefinition {
    /// Chain name; unique within the setup and free of whitespace.
    pub name: String,

    /// Chain string (see [`crate::parse`]).
    #[serde(default)]
    pub operators: String,

    /// Whether the chain starts muted.
    #[serde(default)]
    pub muted: bool,
}

impl ChainDefinition {
    /// Create an unmuted definition.
    pub fn new(name: impl Into<String>, operators: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            operators: operators.into(),
            muted: false,
        }
    }

    /// Set the initial mute state.
    pub fn with_muted(mut self, muted: bool) -> Self {
        self.muted = muted;
        self
    }

    /// Captures a live chain: its name, chain string and mute state.
    pub fn from_chain(chain: &Chain) -> Self {
        Self {
            name: chain.name().to_string(),
            operators: chain.to_string(),
            muted: chain.is_muted(),
        }
    }

    /// Parses the chain string and applies the mute state.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidChain`] if the chain string does not
    /// parse.
    pub fn build(&self, registry: &Registry) -> Result<Chain, ConfigError> {
        let mut chain = parse_named_chain(&self.name, &self.operators, registry)
            .map_err(|e| ConfigError::invalid_chain(&self.name, e))?;
        chain.set_muted(self.muted);
        Ok(chain)
    }
}

/// A named collection of chains and the settings they share.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChainSetup {
    /// Name of the setup.
    pub name: String,

    /// Processing settings.
    #[serde(default)]
    pub settings: EngineSettings,

    /// Preset definitions by name, available to every chain as `-pn:name`
    /// on top of the registry's own.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub presets: BTreeMap<String, String>,

    /// Chains, in processing order.
    #[serde(default)]
    pub chains: Vec<ChainDefinition>,
}

impl Default for ChainSetup {
    fn default() -> Self {
        Self::new("untitled")
    }
}

impl ChainSetup {
    /// Create an empty setup with default settings.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            settings: EngineSettings::default(),
            presets: BTreeMap::new(),
            chains: Vec::new(),
        }
    }

    /// Set the engine settings.
    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Add a preset definition.
    pub fn with_preset(mut self, name: impl Into<String>, definition: impl Into<String>) -> Self {
        self.presets.insert(name.into(), definition.into());
        self
    }

    /// Add a chain definition.
    pub fn with_chain(mut self, chain: ChainDefinition) -> Self {
        self.chains.push(chain);
        self
    }

    /// Captures live chains into a setup.
    pub fn from_chains<'a>(
        name: impl Into<String>,
        settings: EngineSettings,
        chains: impl IntoIterator<Item = &'a Chain>,
    ) -> Self {
        Self {
            name: name.into(),
            settings,
            presets: BTreeMap::new(),
            chains: chains.into_iter().map(ChainDefinition::from_chain).collect(),
        }
    }

    /// Number of chains.
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    /// True if the setup has no chains.
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Finds a chain definition by name.
    pub fn chain(&self, name: &str) -> Option<&ChainDefinition> {
        self.chains.iter().find(|c| c.name == name)
    }

    /// Chain names in order.
    pub fn chain_names(&self) -> Vec<&str> {
        self.chains.iter().map(|c| c.name.as_str()).collect()
    }

    /// Checks settings, chain names and every chain string.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self, registry: &Registry) -> Result<(), ConfigError> {
        self.settings.validate()?;
        let registry = self.with_presets(registry);
        for (i, def) in self.chains.iter().enumerate() {
            if def.name.is_empty() || def.name.contains(char::is_whitespace) {
                return Err(ConfigError::InvalidChainName(def.name.clone()));
            }
            if self.chains[..i].iter().any(|c| c.name == def.name) {
                return Err(ConfigError::DuplicateChain(def.name.clone()));
            }
            def.build(&registry)?;
        }
        Ok(())
    }

    /// `registry` plus this setup's presets.
    fn with_presets<'r>(&self, registry: &'r Registry) -> Cow<'r, Registry> {
        if self.presets.is_empty() {
            return Cow::Borrowed(registry);
        }
        let mut extended = registry.clone();
        for (name, definition) in &self.presets {
            extended.register_preset(name.as_str(), definition.as_str());
        }
        Cow::Owned(extended)
    }

    /// Builds every chain.
    ///
    /// # Errors
    ///
    /// Returns the first validation or parse failure.
    pub fn build(&self, registry: &Registry) -> Result<Vec<Chain>, ConfigError> {
        self.validate(registry)?;
        let registry = self.with_presets(registry);
        let chains = self
            .chains
            .iter()
            .map(|def| def.build(&registry))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(setup = %self.name, chains = chains.len(), "chain setup built");
        Ok(chains)
    }

    /// Builds the chain called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ChainNotFound`] if there is no such chain.
    pub fn build_chain(&self, name: &str, registry: &Registry) -> Result<Chain, ConfigError> {
        self.chain(name)
            .ok_or_else(|| ConfigError::ChainNotFound(name.to_string()))?
            .build(&self.with_presets(registry))
    }

    // ---- TOML ----

    /// Load a setup from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Convert the setup to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    // ---- text ----

    /// Reads the line-oriented text form.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidLine`] for unknown options, malformed
    /// option values and `-a:` lines without a name.
    pub fn from_text(text: &str) -> Result<Self, ConfigError> {
        let mut setup = Self::default();
        for (index, raw) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(rest) = line.strip_prefix(CHAIN_PREFIX) {
                let (name, operators) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                if name.is_empty() {
                    return Err(ConfigError::InvalidLine {
                        line: line_no,
                        message: "chain line without a name".into(),
                    });
                }
                setup
                    .chains
                    .push(ChainDefinition::new(name, operators.trim()));
            } else {
                for token in line.split_whitespace() {
                    setup.apply_option(line_no, token)?;
                }
            }
        }
        Ok(setup)
    }

    fn apply_option(&mut self, line: usize, token: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidLine { line, message };
        let (key, value) = token
            .strip_prefix('-')
            .and_then(|t| t.split_once(':'))
            .ok_or_else(|| invalid(format!("expected '-option:value', found '{token}'")))?;
        let bad_value = || invalid(format!("invalid value '{value}' for -{key}"));
        match key {
            "n" => self.name = value.to_string(),
            "b" => self.settings.buffer_size = value.parse().map_err(|_| bad_value())?,
            "sr" => self.settings.sample_rate = value.parse().map_err(|_| bad_value())?,
            "bits" => self.settings.output_bits = value.parse().map_err(|_| bad_value())?,
            _ => return Err(invalid(format!("unknown option '-{key}'"))),
        }
        Ok(())
    }

    /// Writes the line-oriented text form.
    pub fn to_text(&self) -> String {
        let mut out = format!(
            "-n:{} -b:{} -sr:{} -bits:{}\n",
            self.name,
            self.settings.buffer_size,
            self.settings.sample_rate,
            self.settings.output_bits
        );
        for chain in &self.chains {
            out.push_str(CHAIN_PREFIX);
            out.push_str(&chain.name);
            if !chain.operators.is_empty() {
                out.push(' ');
                out.push_str(&chain.operators);
            }
            out.push('\n');
        }
        out
    }

    // ---- files ----

    /// Load a setup file. `.toml` files are read as TOML, anything else
    /// as the text form.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let setup = if is_toml(path) {
            Self::from_toml(&content)?
        } else {
            Self::from_text(&content)?
        };
        tracing::debug!(path = %path.display(), chains = setup.len(), "chain setup loaded");
        Ok(setup)
    }

    /// Save the setup, in the form chosen by the file extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = if is_toml(path) {
            self.to_toml()?
        } else {
            self.to_text()
        };
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        tracing::debug!(path = %path.display(), chains = self.len(), "chain setup saved");
        Ok(())
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_setup() -> ChainSetup {
        ChainSetup::new("vocal")
            .with_settings(EngineSettings::default().with_sample_rate(44100))
            .with_chain(ChainDefinition::new("main", "-ea:120 -kos:1,0,100,0.5,0"))
            .with_chain(ChainDefinition::new("aux", "-efl:4000").with_muted(true))
    }

    #[test]
    fn test_toml_round_trip() {
        let setup = sample_setup();
        let text = setup.to_toml().unwrap();
        assert!(text.contains("[[chains]]"), "{text}");
        let back = ChainSetup::from_toml(&text).unwrap();
        assert_eq!(back, setup);
    }

    #[test]
    fn test_toml_defaults() {
        let setup = ChainSetup::from_toml(
            r#"
name = "minimal"

[[chains]]
name = "only"
operators = "-ea:50"
"#,
        )
        .unwrap();
        assert_eq!(setup.settings, EngineSettings::default());
        assert_eq!(setup.chain("only").map(|c| c.muted), Some(false));
    }

    #[test]
    fn test_text_round_trip_drops_only_muting() {
        let setup = sample_setup();
        let text = setup.to_text();
        assert_eq!(
            text,
            "-n:vocal -b:1024 -sr:44100 -bits:32\n\
             -a:main -ea:120 -kos:1,0,100,0.5,0\n\
             -a:aux -efl:4000\n"
        );
        let back = ChainSetup::from_text(&text).unwrap();
        assert_eq!(back.name, "vocal");
        assert_eq!(back.settings, setup.settings);
        assert_eq!(back.chain_names(), vec!["main", "aux"]);
        assert_eq!(back.chain("aux").map(|c| c.muted), Some(false));
    }

    #[test]
    fn test_text_skips_comments_and_blank_lines() {
        let setup = ChainSetup::from_text("# header\n\n  -a:dry\n-a:wet   -ea:80  \n").unwrap();
        assert_eq!(setup.len(), 2);
        assert_eq!(setup.chain("dry").map(|c| c.operators.as_str()), Some(""));
        assert_eq!(setup.chain("wet").map(|c| c.operators.as_str()), Some("-ea:80"));
    }

    #[test]
    fn test_text_errors_name_the_line() {
        let err = ChainSetup::from_text("-a:x -ea:1\n-q:1\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLine { line: 2, .. }), "{err}");
        let err = ChainSetup::from_text("-b:lots").unwrap_err();
        assert!(err.to_string().contains("-b"), "{err}");
        assert!(ChainSetup::from_text("-a: -ea:1").is_err());
        assert!(ChainSetup::from_text("bare").is_err());
    }

    #[test]
    fn test_build_applies_mute() {
        let registry = Registry::new();
        let chains = sample_setup().build(&registry).unwrap();
        assert_eq!(chains.len(), 2);
        assert_eq!(chains[0].name(), "main");
        assert_eq!(chains[0].number_of_controllers(), 1);
        assert!(!chains[0].is_muted());
        assert!(chains[1].is_muted());
    }

    #[test]
    fn test_build_reports_bad_chain() {
        let registry = Registry::new();
        let setup = ChainSetup::new("bad").with_chain(ChainDefinition::new("main", "-ea:1 -zz"));
        let err = setup.build(&registry).unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidChain { ref chain, .. } if chain == "main"),
            "{err}"
        );
    }

    #[test]
    fn test_validate_names() {
        let registry = Registry::new();
        let dup = ChainSetup::new("d")
            .with_chain(ChainDefinition::new("a", ""))
            .with_chain(ChainDefinition::new("a", ""));
        assert!(matches!(
            dup.validate(&registry),
            Err(ConfigError::DuplicateChain(_))
        ));
        let spaced = ChainSetup::new("s").with_chain(ChainDefinition::new("a b", ""));
        assert!(matches!(
            spaced.validate(&registry),
            Err(ConfigError::InvalidChainName(_))
        ));
    }

    #[test]
    fn test_build_chain_by_name() {
        let registry = Registry::new();
        let setup = sample_setup();
        assert!(setup.build_chain("aux", &registry).is_ok());
        assert!(matches!(
            setup.build_chain("nope", &registry),
            Err(ConfigError::ChainNotFound(_))
        ));
    }

    #[test]
    fn test_capture_live_chains() {
        let registry = Registry::new();
        let mut chain = parse_named_chain("live", "-ea:75 -epp:20", &registry).unwrap();
        chain.set_muted(true);
        let setup = ChainSetup::from_chains("snap", EngineSettings::default(), [&chain]);
        assert_eq!(
            setup.chains,
            vec![ChainDefinition::new("live", "-ea:75 -epp:20").with_muted(true)]
        );
    }

    #[test]
    fn test_setup_presets() {
        let registry = Registry::new();
        let setup = ChainSetup::new("p")
            .with_preset("soft", "-ea:%level")
            .with_chain(ChainDefinition::new("main", "-pn:soft,40"));
        let chains = setup.build(&registry).unwrap();
        assert_eq!(chains[0].to_string(), "-pn:soft,40");
        assert!(registry.preset("soft").is_none());

        let text = setup.to_toml().unwrap();
        assert!(text.contains("[presets]"), "{text}");
        assert_eq!(ChainSetup::from_toml(&text).unwrap(), setup);
        assert!(!sample_setup().to_toml().unwrap().contains("presets"));
    }
}
