//! Shared CLI helpers used across multiple commands.

use catena_core::Operator;
use serde::Serialize;

/// One parameter as listed by `operators`, `controllers` and `check`.
#[derive(Debug, Clone, Serialize)]
pub struct ParamInfo {
    /// 1-based parameter index.
    pub index: usize,
    /// Parameter name.
    pub name: String,
    /// Default (or, for live objects, current) value.
    pub value: f32,
    /// Lower bound, if any.
    pub min: Option<f32>,
    /// Upper bound, if any.
    pub max: Option<f32>,
    /// Property flags: "integer", "toggled", "output", "log".
    pub flags: Vec<&'static str>,
}

/// Collects the parameter list of `op`.
///
/// With `current` set the value column holds the live value, otherwise the
/// declared default.
pub fn describe_params<T: Operator + ?Sized>(op: &T, current: bool) -> Vec<ParamInfo> {
    (1..=op.number_of_params())
        .filter_map(|index| {
            let desc = op.describe_parameter(index)?;
            let mut flags = Vec::new();
            if desc.is_integer() {
                flags.push("integer");
            }
            if desc.is_toggled() {
                flags.push("toggled");
            }
            if desc.is_output() {
                flags.push("output");
            }
            if desc.is_logarithmic() {
                flags.push("log");
            }
            Some(ParamInfo {
                index,
                name: op.parameter_name(index)?.into_owned(),
                value: if current {
                    op.get_parameter(index)
                } else {
                    desc.default_value
                },
                min: desc.lower_bound,
                max: desc.upper_bound,
                flags,
            })
        })
        .collect()
}

/// Human-readable bounds column.
pub fn format_range(param: &ParamInfo) -> String {
    match (param.min, param.max) {
        (Some(lo), Some(hi)) => format!("{lo} .. {hi}"),
        (Some(lo), None) => format!(">= {lo}"),
        (None, Some(hi)) => format!("<= {hi}"),
        (None, None) => "any".to_string(),
    }
}

/// Prints a parameter table indented by `indent` spaces.
pub fn print_param_table(params: &[ParamInfo], value_header: &str, indent: usize) {
    let pad = " ".repeat(indent);
    if params.is_empty() {
        println!("{pad}(no parameters)");
        return;
    }
    println!("{pad}{:>3}  {:24}  {:>10}  {:18}  Flags", "#", "Name", value_header, "Range");
    for param in params {
        println!(
            "{pad}{:>3}  {:24}  {:>10}  {:18}  {}",
            param.index,
            param.name,
            param.value,
            format_range(param),
            param.flags.join(",")
        );
    }
}

/// Linear amplitude to decibels, floored at -120 dB.
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        -120.0
    } else {
        20.0 * linear.log10()
    }
}

/// Root mean square of a sample slice.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples.iter().map(|s| s * s).sum();
    (sum / samples.len() as f32).sqrt()
}

/// Largest absolute sample value.
pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0, f32::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use catena_registry::Registry;

    #[test]
    fn test_describe_params_from_registry() {
        let registry = Registry::new();
        let op = registry.create_operator("efl", &[800.0]).unwrap();

        let defaults = describe_params(op.as_ref(), false);
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].index, 1);
        assert_ne!(defaults[0].value, 800.0);

        let live = describe_params(op.as_ref(), true);
        assert_eq!(live[0].value, 800.0);
    }

    #[test]
    fn test_format_range() {
        let mut param = ParamInfo {
            index: 1,
            name: "x".into(),
            value: 0.0,
            min: Some(0.0),
            max: Some(100.0),
            flags: Vec::new(),
        };
        assert_eq!(format_range(&param), "0 .. 100");
        param.max = None;
        assert_eq!(format_range(&param), ">= 0");
        param.min = None;
        assert_eq!(format_range(&param), "any");
    }

    #[test]
    fn test_levels() {
        assert_eq!(linear_to_db(0.0), -120.0);
        assert!((linear_to_db(1.0)).abs() < 1e-6);
        assert_eq!(peak(&[0.1, -0.7, 0.3]), 0.7);
        assert!((rms(&[1.0, -1.0]) - 1.0).abs() < 1e-6);
        assert_eq!(rms(&[]), 0.0);
    }
}
