//! Preset definitions: expansion and preset files.
//!
//! A preset definition is a chain string that may also contain
//!
//! - `%name` in place of a value, which turns that parameter into a
//!   parameter of the preset itself, starting at the inner default;
//! - `|` between clauses, which splits the definition into parallel
//!   branches whose outputs are averaged.
//!
//! ```text
//! -efl:%cutoff -ea:120 | -efh:2000 -ea:%level
//! ```
//!
//! Named presets live in the [`Registry`] and are used with `-pn:name`.
//! [`load_presets`] fills a registry from a preset library file:
//!
//! ```text
//! # name = definition
//! bright = -efh:%cutoff -ea:110
//! wide   = -etf:20 | \
//!          -etc:2,50,20,0.4
//! ```
//!
//! A line ending in `\` continues on the next line. `-pf:path` reads a single
//! definition from a file of its own; `#` lines are skipped there too.

use std::path::{Path, PathBuf};

use catena_core::{Operator, Preset, PresetOrigin, PresetParam, PresetSlot};
use catena_registry::{KeywordKind, PresetDefinition, Registry};

use crate::error::{ConfigError, ParseError};
use crate::parse::{Clause, build_nested, parse_template};

/// Keyword of a named preset clause, without the leading `-`.
pub const PRESET_NAMED: &str = "pn";

/// Keyword of a preset file clause, without the leading `-`.
pub const PRESET_FILE: &str = "pf";

/// Presets may use presets this many levels deep.
pub const MAX_PRESET_DEPTH: usize = 8;

/// Separator between parallel branches of a definition.
const BRANCH_SEPARATOR: char = '|';

/// Resolves a `-pn` or `-pf` clause into a preset operator.
pub(crate) fn expand_preset(
    pos: usize,
    keyword: &str,
    label: &str,
    registry: &Registry,
    depth: usize,
) -> Result<Preset, ParseError> {
    let invalid = |reason: String| ParseError::InvalidPreset {
        pos,
        name: label.to_string(),
        reason,
    };
    if depth >= MAX_PRESET_DEPTH {
        return Err(invalid(format!("nested more than {MAX_PRESET_DEPTH} deep")));
    }

    let (origin, definition) = if keyword == PRESET_FILE {
        let definition = read_preset_file(label).map_err(|e| invalid(e.to_string()))?;
        (PresetOrigin::File(PathBuf::from(label)), definition)
    } else {
        let definition = registry
            .preset(label)
            .ok_or_else(|| ParseError::UnknownPreset {
                pos,
                name: label.to_string(),
            })?
            .definition
            .clone();
        (PresetOrigin::Named(label.to_string()), definition)
    };

    let preset = assemble(origin, &definition, registry, depth).map_err(invalid)?;
    tracing::debug!(
        preset = label,
        branches = preset.branches().len(),
        params = preset.number_of_params(),
        "preset expanded"
    );
    Ok(preset)
}

/// Builds the branches of `definition` and routes its placeholders.
fn assemble(
    origin: PresetOrigin,
    definition: &str,
    registry: &Registry,
    depth: usize,
) -> Result<Preset, String> {
    let label = origin.label();
    let mut branches = Vec::new();
    let mut params = Vec::new();

    for (index, text) in definition.split(BRANCH_SEPARATOR).enumerate() {
        let (clauses, holes) = parse_template(text).map_err(|e| e.to_string())?;
        if clauses.is_empty() {
            return Err(format!("branch {} is empty", index + 1));
        }
        let name = format!("{label}#{}", index + 1);
        let chain =
            build_nested(&name, &clauses, registry, depth + 1).map_err(|e| e.to_string())?;

        let slots = clause_slots(&clauses, registry);
        for hole in holes {
            let Some(slot) = slots.get(hole.clause).copied().flatten() else {
                continue;
            };
            let param = hole.value + 1;
            let exists = match slot {
                PresetSlot::Operator(n) => chain
                    .chain_operator(n)
                    .is_some_and(|op| op.is_parameter_index(param)),
                PresetSlot::Controller(n) => chain
                    .controller(n)
                    .is_some_and(|c| c.is_parameter_index(param)),
            };
            if exists {
                params.push(PresetParam {
                    name: hole.name,
                    branch: index,
                    slot,
                    param,
                });
            } else {
                tracing::warn!(preset = %label, name = %hole.name, "placeholder has no parameter");
            }
        }
        branches.push(chain);
    }

    let mut preset = Preset::new(origin, definition.trim(), branches, params);
    for index in 1..=preset.number_of_params() {
        let default = preset
            .describe_parameter(index)
            .map_or(0.0, |d| d.default_value);
        preset.set_parameter(index, default);
    }
    Ok(preset)
}

/// What each clause became in the built chain.
fn clause_slots(clauses: &[Clause], registry: &Registry) -> Vec<Option<PresetSlot>> {
    let mut operators = 0;
    let mut controllers = 0;
    clauses
        .iter()
        .map(|clause| match clause {
            Clause::Marker { .. } => None,
            Clause::Preset { .. } => {
                operators += 1;
                Some(PresetSlot::Operator(operators))
            }
            Clause::Object { keyword, .. } => match registry.lookup(keyword)? {
                KeywordKind::Operator => {
                    operators += 1;
                    Some(PresetSlot::Operator(operators))
                }
                KeywordKind::Controller => {
                    controllers += 1;
                    Some(PresetSlot::Controller(controllers))
                }
            },
        })
        .collect()
}

/// Reads a single preset definition from `path`.
///
/// Lines starting with `#` are skipped and the rest are joined with spaces.
///
/// # Errors
///
/// Returns [`ConfigError::ReadFile`] if the file cannot be read.
pub fn read_preset_file(path: impl AsRef<Path>) -> Result<String, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
    let definition = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect::<Vec<_>>()
        .join(" ");
    Ok(definition)
}

/// Parses a preset library: `name = definition` lines.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidLine`] for lines without `=`, empty
/// definitions and names that are empty or contain whitespace or commas.
pub fn parse_presets(text: &str) -> Result<Vec<PresetDefinition>, ConfigError> {
    let mut presets = Vec::new();
    let mut pending = String::new();
    let mut first_line = 0;

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if pending.is_empty() {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            first_line = index + 1;
        }
        match line.strip_suffix('\\') {
            Some(head) => {
                pending.push_str(head.trim_end());
                pending.push(' ');
            }
            None => {
                pending.push_str(line);
                presets.push(preset_line(first_line, &pending)?);
                pending.clear();
            }
        }
    }
    if !pending.is_empty() {
        presets.push(preset_line(first_line, &pending)?);
    }
    Ok(presets)
}

fn preset_line(line: usize, text: &str) -> Result<PresetDefinition, ConfigError> {
    let invalid = |message: &str| ConfigError::InvalidLine {
        line,
        message: message.to_string(),
    };
    let (name, definition) = text
        .split_once('=')
        .ok_or_else(|| invalid("expected 'name = definition'"))?;
    let (name, definition) = (name.trim(), definition.trim());
    if name.is_empty() || name.contains(|c: char| c.is_whitespace() || c == ',') {
        return Err(invalid("preset name must be one word without commas"));
    }
    if definition.is_empty() {
        return Err(invalid("preset definition is empty"));
    }
    Ok(PresetDefinition {
        name: name.to_string(),
        definition: definition.to_string(),
    })
}

/// Reads a preset library file into `registry`. Returns how many presets
/// were registered; a name already present is replaced.
///
/// # Errors
///
/// Returns [`ConfigError::ReadFile`] or the first malformed line.
pub fn load_presets(path: impl AsRef<Path>, registry: &mut Registry) -> Result<usize, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
    let presets = parse_presets(&content)?;
    let count = presets.len();
    for preset in presets {
        registry.register_preset(preset.name, preset.definition);
    }
    tracing::debug!(path = %path.display(), presets = count, "presets loaded");
    Ok(count)
}
