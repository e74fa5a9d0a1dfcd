//! Chain-string parser and builder.
//!
//! A chain string lists operators in processing order, each optionally
//! followed by the controllers that drive it:
//!
//! ```text
//! -ea:120 -kos:1,0,100,0.5,0 -efl:4000
//! -efl:800 -kos:1,400,1200,0.5,0 -kx -kl:3,1200,2000,4
//! ```
//!
//! ## Grammar
//!
//! ```text
//! chain     ::= clause*
//! clause    ::= marker | preset | object
//! marker    ::= '-kx'
//! preset    ::= ( '-pn' | '-pf' ) ':' label ( ',' number )*
//! object    ::= '-' keyword ( ':' number ( ',' number )* )?
//! keyword   ::= [A-Za-z0-9_]+
//! label     ::= [^,\s]+
//! ```
//!
//! `-pn:name` expands the preset stored under `name` in the registry and
//! `-pf:path` the preset definition in a file; the numbers after the label
//! set the preset's parameters. Inside a preset definition a value may be a
//! `%name` placeholder and `|` separates parallel branches (see
//! [`crate::preset`]).
//!
//! A controller with no marker in front of it drives the last operator.
//! With `k` markers it drives the controller at nesting depth `k - 1` on
//! the current path, so one `-kx` attaches to the controller just added
//! at the top level, two attach one level further down, and so on. This is
//! exactly what [`Chain`]'s `Display` writes, so printing a chain and
//! parsing the result gives back the same structure.
//!
//! Two-phase design: [`parse_clauses`] is pure and needs no registry;
//! [`build_chain`] resolves keywords and assembles the [`Chain`].

use std::fmt;

use catena_core::{Chain, ControllerId};
use catena_registry::{KeywordKind, Registry, apply_values};

use crate::error::ParseError;
use crate::preset::{PRESET_FILE, PRESET_NAMED, expand_preset};

/// Keyword of the nesting marker, without the leading `-`.
pub const CONTROLLER_MARKER: &str = "kx";

/// A `%name` value inside a preset definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Placeholder {
    /// Index of the clause holding it.
    pub clause: usize,
    /// 0-based position among the clause's values.
    pub value: usize,
    /// Name without the `%`.
    pub name: String,
}

/// One whitespace-separated clause of a chain string.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// `-kx`: the next controller nests one level deeper.
    Marker {
        /// Byte position of the `-`.
        pos: usize,
    },
    /// `-pn:name` or `-pf:path`, expanded into a preset operator.
    Preset {
        /// Byte position of the `-`.
        pos: usize,
        /// `pn` or `pf`.
        keyword: String,
        /// Preset name or file path.
        label: String,
        /// Values for the preset's parameters 1, 2, ...
        values: Vec<f32>,
    },
    /// An operator or controller with positional parameter values.
    Object {
        /// Byte position of the `-`.
        pos: usize,
        /// Keyword without the leading `-`.
        keyword: String,
        /// Values for parameters 1, 2, ...
        values: Vec<f32>,
    },
}

impl Clause {
    /// Byte position of the clause in the parsed input.
    pub fn position(&self) -> usize {
        match self {
            Clause::Marker { pos } | Clause::Preset { pos, .. } | Clause::Object { pos, .. } => {
                *pos
            }
        }
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Clause::Marker { .. } => write!(f, "-{CONTROLLER_MARKER}"),
            Clause::Preset {
                keyword,
                label,
                values,
                ..
            } => {
                write!(f, "-{keyword}:{label}")?;
                for v in values {
                    write!(f, ",{v}")?;
                }
                Ok(())
            }
            Clause::Object {
                keyword, values, ..
            } => {
                write!(f, "-{keyword}")?;
                for (i, v) in values.iter().enumerate() {
                    let sep = if i == 0 { ':' } else { ',' };
                    write!(f, "{sep}{v}")?;
                }
                Ok(())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Single-pass clause scanner. Structural characters are all ASCII, so every
/// position it stops at is a char boundary.
struct Parser<'a> {
    text: &'a str,
    input: &'a [u8],
    pos: usize,
    /// Collects `%name` values when parsing a preset definition; `None`
    /// rejects them as bad numbers.
    placeholders: Option<Vec<Placeholder>>,
    clause: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            input: text.as_bytes(),
            pos: 0,
            placeholders: None,
            clause: 0,
        }
    }

    fn with_placeholders(text: &'a str) -> Self {
        Self {
            placeholders: Some(Vec::new()),
            ..Self::new(text)
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn char_at(&self, pos: usize) -> char {
        self.text[pos..].chars().next().unwrap_or('\0')
    }

    fn at_separator(&self) -> bool {
        self.peek().is_none_or(|b| b.is_ascii_whitespace())
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn parse_all(&mut self) -> Result<Vec<Clause>, ParseError> {
        let mut clauses = Vec::new();
        loop {
            self.skip_ws();
            if self.peek().is_none() {
                return Ok(clauses);
            }
            self.clause = clauses.len();
            clauses.push(self.parse_clause()?);
        }
    }

    /// `clause ::= '-' keyword ( ':' values )?`
    fn parse_clause(&mut self) -> Result<Clause, ParseError> {
        let start = self.pos;
        if self.peek() != Some(b'-') {
            return Err(ParseError::UnexpectedChar {
                pos: start,
                ch: self.char_at(start),
            });
        }
        self.pos += 1;

        let key_start = self.pos;
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_')
        {
            self.pos += 1;
        }
        let keyword = &self.text[key_start..self.pos];
        if keyword.is_empty() {
            if self.at_separator() {
                return Err(ParseError::EmptyKeyword { pos: start });
            }
            return Err(ParseError::UnexpectedChar {
                pos: self.pos,
                ch: self.char_at(self.pos),
            });
        }

        if keyword == CONTROLLER_MARKER {
            if !self.at_separator() {
                return Err(ParseError::UnexpectedChar {
                    pos: self.pos,
                    ch: self.char_at(self.pos),
                });
            }
            return Ok(Clause::Marker { pos: start });
        }

        if keyword == PRESET_NAMED || keyword == PRESET_FILE {
            return self.parse_preset(start, keyword);
        }

        let values = match self.peek() {
            None => Vec::new(),
            Some(b) if b.is_ascii_whitespace() => Vec::new(),
            Some(b':') => {
                self.pos += 1;
                self.parse_values()?
            }
            Some(_) => {
                return Err(ParseError::UnexpectedChar {
                    pos: self.pos,
                    ch: self.char_at(self.pos),
                });
            }
        };

        Ok(Clause::Object {
            pos: start,
            keyword: keyword.to_string(),
            values,
        })
    }

    /// Advances over one value token and returns it.
    fn token(&mut self) -> (usize, &'a str) {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| b != b',' && !b.is_ascii_whitespace())
        {
            self.pos += 1;
        }
        let text = self.text;
        (start, &text[start..self.pos])
    }

    /// `preset ::= ('-pn' | '-pf') ':' label (',' number)*`
    fn parse_preset(&mut self, start: usize, keyword: &str) -> Result<Clause, ParseError> {
        if self.peek() != Some(b':') {
            return Err(ParseError::MissingPresetName { pos: start });
        }
        self.pos += 1;
        let (_, label) = self.token();
        if label.is_empty() {
            return Err(ParseError::MissingPresetName { pos: start });
        }
        let values = if self.peek() == Some(b',') {
            self.pos += 1;
            self.parse_values()?
        } else {
            Vec::new()
        };
        Ok(Clause::Preset {
            pos: start,
            keyword: keyword.to_string(),
            label: label.to_string(),
            values,
        })
    }

    /// `values ::= number ( ',' number )*`
    fn parse_values(&mut self) -> Result<Vec<f32>, ParseError> {
        let mut values = Vec::new();
        loop {
            let (start, token) = self.token();
            let value = match (token.strip_prefix('%'), self.placeholders.as_mut()) {
                (Some(name), Some(found)) if !name.is_empty() => {
                    found.push(Placeholder {
                        clause: self.clause,
                        value: values.len(),
                        name: name.to_string(),
                    });
                    Some(0.0)
                }
                _ => token.parse::<f32>().ok().filter(|v| v.is_finite()),
            };
            let value = value.ok_or_else(|| ParseError::BadNumber {
                pos: start,
                text: token.to_string(),
            })?;
            values.push(value);

            if self.peek() == Some(b',') {
                self.pos += 1;
            } else {
                return Ok(values);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Splits a chain string into clauses without resolving any keyword.
///
/// # Errors
///
/// Returns [`ParseError`] on syntax errors: a clause not starting with `-`,
/// an empty keyword, or a value that is not a finite number.
pub fn parse_clauses(text: &str) -> Result<Vec<Clause>, ParseError> {
    let clauses = Parser::new(text).parse_all()?;
    tracing::trace!(clauses = clauses.len(), "chain string split");
    Ok(clauses)
}

/// Like [`parse_clauses`], but also accepts `%name` values, returned
/// separately and written as 0 in the clauses.
pub(crate) fn parse_template(text: &str) -> Result<(Vec<Clause>, Vec<Placeholder>), ParseError> {
    let mut parser = Parser::with_placeholders(text);
    let clauses = parser.parse_all()?;
    Ok((clauses, parser.placeholders.unwrap_or_default()))
}

/// Assembles a chain named `name` from parsed clauses.
///
/// Values are written positionally; surplus values are dropped and missing
/// ones keep their defaults.
///
/// # Errors
///
/// Returns [`ParseError`] for unknown keywords, controllers without a
/// target, `-kx` markers not followed by a controller and presets that are
/// missing or do not build.
pub fn build_chain(
    name: &str,
    clauses: &[Clause],
    registry: &Registry,
) -> Result<Chain, ParseError> {
    build_nested(name, clauses, registry, 0)
}

/// [`build_chain`] at preset nesting depth `depth`.
pub(crate) fn build_nested(
    name: &str,
    clauses: &[Clause],
    registry: &Registry,
    depth: usize,
) -> Result<Chain, ParseError> {
    let mut chain = Chain::new(name);
    // Controllers on the current nesting path, outermost first.
    let mut path: Vec<ControllerId> = Vec::new();
    let mut markers = 0usize;
    let mut first_marker = 0usize;

    for clause in clauses {
        let (pos, keyword, values) = match clause {
            Clause::Marker { pos } => {
                if markers == 0 {
                    first_marker = *pos;
                }
                markers += 1;
                continue;
            }
            Clause::Preset {
                pos,
                keyword,
                label,
                values,
            } => {
                if markers > 0 {
                    return Err(ParseError::DanglingMarker { pos: first_marker });
                }
                let mut preset = expand_preset(*pos, keyword, label, registry, depth)?;
                apply_values(&mut preset, values);
                chain.add_chain_operator(Box::new(preset));
                path.clear();
                continue;
            }
            Clause::Object {
                pos,
                keyword,
                values,
            } => (*pos, keyword.as_str(), values.as_slice()),
        };
        let unknown = || ParseError::UnknownKeyword {
            pos,
            keyword: keyword.to_string(),
        };
        let no_target = || ParseError::NoTarget {
            pos,
            keyword: keyword.to_string(),
        };

        match registry.lookup(keyword) {
            None => return Err(unknown()),
            Some(KeywordKind::Operator) => {
                if markers > 0 {
                    return Err(ParseError::DanglingMarker { pos: first_marker });
                }
                let op = registry
                    .create_operator(keyword, values)
                    .map_err(|_| unknown())?;
                chain.add_chain_operator(op);
                path.clear();
            }
            Some(KeywordKind::Controller) => {
                if markers == 0 {
                    let last = chain.number_of_chain_operators();
                    if last == 0 {
                        return Err(no_target());
                    }
                    chain.select_chain_operator(last);
                    chain.selected_chain_operator_as_target();
                } else {
                    let parent = path
                        .get(markers - 1)
                        .and_then(|id| chain.controller_index(*id))
                        .ok_or_else(no_target)?;
                    chain.select_controller(parent);
                    chain.selected_controller_as_target();
                }
                let ctrl = registry
                    .create_controller(keyword, values)
                    .map_err(|_| unknown())?;
                let id = chain.add_controller(ctrl).ok_or_else(no_target)?;
                path.truncate(markers);
                path.push(id);
                markers = 0;
            }
        }
    }

    if markers > 0 {
        return Err(ParseError::DanglingMarker { pos: first_marker });
    }
    tracing::debug!(
        chain = name,
        operators = chain.number_of_chain_operators(),
        controllers = chain.number_of_controllers(),
        "chain built"
    );
    Ok(chain)
}

/// Parses `text` into a chain named `"default"`.
///
/// # Errors
///
/// See [`parse_clauses`] and [`build_chain`].
pub fn parse_chain(text: &str, registry: &Registry) -> Result<Chain, ParseError> {
    parse_named_chain("default", text, registry)
}

/// Parses `text` into a chain named `name`.
///
/// # Errors
///
/// See [`parse_clauses`] and [`build_chain`].
pub fn parse_named_chain(
    name: &str,
    text: &str,
    registry: &Registry,
) -> Result<Chain, ParseError> {
    let clauses = parse_clauses(text)?;
    build_chain(name, &clauses, registry)
}
