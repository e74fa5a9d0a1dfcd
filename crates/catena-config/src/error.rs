//! Error types for chain strings and setup files.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from parsing or building a chain string.
///
/// Every variant carries the byte position in the input where the offending
/// clause starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// A character that cannot start or continue a clause.
    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedChar {
        /// Byte position in the input string.
        pos: usize,
        /// The unexpected character.
        ch: char,
    },

    /// A `-` with no keyword after it.
    #[error("empty keyword at position {pos}")]
    EmptyKeyword {
        /// Byte position of the `-`.
        pos: usize,
    },

    /// A parameter value that is not a finite number.
    #[error("invalid number '{text}' at position {pos}")]
    BadNumber {
        /// Byte position of the value.
        pos: usize,
        /// The text that failed to parse.
        text: String,
    },

    /// The keyword names neither an operator nor a controller.
    #[error("unknown keyword '-{keyword}' at position {pos}")]
    UnknownKeyword {
        /// Byte position of the clause.
        pos: usize,
        /// The keyword, without the leading `-`.
        keyword: String,
    },

    /// A controller with nothing to attach to: no operator before it, or
    /// more `-kx` markers than there are controllers to nest under.
    #[error("controller '-{keyword}' at position {pos} has no target")]
    NoTarget {
        /// Byte position of the clause.
        pos: usize,
        /// The controller keyword.
        keyword: String,
    },

    /// A `-kx` marker not followed by a controller.
    #[error("'-kx' at position {pos} must be followed by a controller")]
    DanglingMarker {
        /// Byte position of the marker.
        pos: usize,
    },

    /// `-pn` or `-pf` without a name or path after the colon.
    #[error("preset clause at position {pos} needs a name")]
    MissingPresetName {
        /// Byte position of the clause.
        pos: usize,
    },

    /// `-pn:name` with no preset of that name in the registry.
    #[error("unknown preset '{name}' at position {pos}")]
    UnknownPreset {
        /// Byte position of the clause.
        pos: usize,
        /// The preset name.
        name: String,
    },

    /// A preset whose definition cannot be read or does not build.
    #[error("invalid preset '{name}' at position {pos}: {reason}")]
    InvalidPreset {
        /// Byte position of the clause.
        pos: usize,
        /// Preset name or file path.
        name: String,
        /// What went wrong.
        reason: String,
    },
}

impl ParseError {
    /// Byte position the error refers to.
    pub fn position(&self) -> usize {
        match self {
            ParseError::UnexpectedChar { pos, .. }
            | ParseError::EmptyKeyword { pos }
            | ParseError::BadNumber { pos, .. }
            | ParseError::UnknownKeyword { pos, .. }
            | ParseError::NoTarget { pos, .. }
            | ParseError::DanglingMarker { pos }
            | ParseError::MissingPresetName { pos }
            | ParseError::UnknownPreset { pos, .. }
            | ParseError::InvalidPreset { pos, .. } => *pos,
        }
    }
}

/// Errors that can occur while loading, saving or building a chain setup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a file
    #[error("failed to write file '{path}': {source}")]
    WriteFile {
        /// Path of the file that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to create directory
    #[error("failed to create directory '{path}': {source}")]
    CreateDir {
        /// Path of the directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to serialize TOML
    #[error("failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// A chain definition whose chain string does not parse
    #[error("invalid chain '{chain}': {source}")]
    InvalidChain {
        /// Name of the chain.
        chain: String,
        /// What is wrong with its chain string.
        #[source]
        source: ParseError,
    },

    /// No chain with this name in the setup
    #[error("chain not found: {0}")]
    ChainNotFound(String),

    /// Two chains share a name
    #[error("duplicate chain name: {0}")]
    DuplicateChain(String),

    /// A chain name that is empty or contains whitespace
    #[error("invalid chain name '{0}'")]
    InvalidChainName(String),

    /// A line of a text setup that is neither an option line nor a chain
    #[error("invalid setup line {line}: {message}")]
    InvalidLine {
        /// 1-based line number.
        line: usize,
        /// Description.
        message: String,
    },

    /// An engine setting outside its legal range
    #[error("invalid setting '{name}': {reason}")]
    InvalidSetting {
        /// Setting name.
        name: &'static str,
        /// Description of why the value is rejected.
        reason: String,
    },
}

impl ConfigError {
    /// Create a read file error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// Create a write file error.
    pub fn write_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::WriteFile {
            path: path.into(),
            source,
        }
    }

    /// Create a create directory error.
    pub fn create_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::CreateDir {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid chain error.
    pub fn invalid_chain(chain: impl Into<String>, source: ParseError) -> Self {
        ConfigError::InvalidChain {
            chain: chain.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    fn mock_io_err() -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::NotFound, "mock")
    }

    #[test]
    fn test_read_file_display() {
        let err = ConfigError::read_file("/a/b.toml", mock_io_err());
        let msg = err.to_string();
        assert!(msg.contains("failed to read file"), "got: {msg}");
        assert!(msg.contains("/a/b.toml"), "got: {msg}");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_write_file_factory() {
        let err = ConfigError::write_file("/out/path", mock_io_err());
        assert!(
            matches!(err, ConfigError::WriteFile { ref path, .. } if path == std::path::Path::new("/out/path"))
        );
    }

    #[test]
    fn test_invalid_chain_exposes_parse_error() {
        let err = ConfigError::invalid_chain("main", ParseError::EmptyKeyword { pos: 4 });
        assert_eq!(
            err.to_string(),
            "invalid chain 'main': empty keyword at position 4"
        );
        let source = err.source().map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("empty keyword at position 4"));
    }

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::UnknownKeyword {
            pos: 8,
            keyword: "zz".into(),
        };
        assert_eq!(err.to_string(), "unknown keyword '-zz' at position 8");
        assert_eq!(err.position(), 8);

        let err = ParseError::BadNumber {
            pos: 3,
            text: "1.2.3".into(),
        };
        assert_eq!(err.to_string(), "invalid number '1.2.3' at position 3");
    }

    #[test]
    fn test_preset_error_display() {
        let err = ParseError::InvalidPreset {
            pos: 2,
            name: "warm".into(),
            reason: "empty branch".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid preset 'warm' at position 2: empty branch"
        );
        assert_eq!(err.position(), 2);
        let err = ParseError::UnknownPreset {
            pos: 0,
            name: "cold".into(),
        };
        assert_eq!(err.to_string(), "unknown preset 'cold' at position 0");
    }

    #[test]
    fn test_setting_display() {
        let err = ConfigError::InvalidSetting {
            name: "buffer_size",
            reason: "must be at least 1".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid setting 'buffer_size': must be at least 1"
        );
    }
}
