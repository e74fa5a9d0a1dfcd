//! Chain operator listing command.

use super::common::{ParamInfo, describe_params, print_param_table};
use catena_registry::{OperatorCategory, Registry};
use clap::Args;
use serde::Serialize;

#[derive(Args)]
pub struct OperatorsArgs {
    /// Show details for one operator keyword (e.g. "etd")
    #[arg(value_name = "KEYWORD")]
    keyword: Option<String>,

    /// Only list one category (amplitude, dynamics, mixing, filter,
    /// time-based, modulation, analysis, gate, pitch)
    #[arg(short, long)]
    category: Option<String>,

    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct OperatorListing {
    keyword: &'static str,
    name: &'static str,
    category: &'static str,
    description: &'static str,
    parameters: Vec<ParamInfo>,
}

pub fn run(args: OperatorsArgs, registry: &Registry) -> anyhow::Result<()> {
    let operators = registry.operators();

    let descriptors = if let Some(keyword) = &args.keyword {
        let desc = operators
            .get(keyword.trim_start_matches('-'))
            .ok_or_else(|| anyhow::anyhow!("Unknown operator: {}", keyword))?;
        vec![desc]
    } else if let Some(category) = &args.category {
        let category: OperatorCategory = category.parse()?;
        operators.operators_in_category(category)
    } else {
        operators.all_operators()
    };

    let mut listings = Vec::with_capacity(descriptors.len());
    for desc in descriptors {
        let parameters = operators
            .create(desc.keyword)
            .map(|op| describe_params(op.as_ref(), false))
            .unwrap_or_default();
        listings.push(OperatorListing {
            keyword: desc.keyword,
            name: desc.name,
            category: desc.category.name(),
            description: desc.description,
            parameters,
        });
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&listings)?);
        return Ok(());
    }

    if args.keyword.is_some() {
        for op in &listings {
            let title = format!("-{}  {}", op.keyword, op.name);
            println!("{title}");
            println!("{}", "=".repeat(title.len()));
            println!();
            println!("{}", op.description);
            println!("Category: {}", op.category);
            println!();
            println!("Parameters:");
            print_param_table(&op.parameters, "Default", 2);
            println!();
            let example: Vec<String> = op.parameters.iter().map(|p| p.value.to_string()).collect();
            println!("Example:");
            if example.is_empty() {
                println!("  catena check \"-{}\"", op.keyword);
            } else {
                println!("  catena check \"-{}:{}\"", op.keyword, example.join(","));
            }
        }
        return Ok(());
    }

    println!("Chain Operators");
    println!("===============");
    for category in OperatorCategory::ALL {
        let mut in_category = listings
            .iter()
            .filter(|op| op.category == category.name())
            .peekable();
        if in_category.peek().is_none() {
            continue;
        }
        println!();
        println!("{}:", category.name());
        for op in in_category {
            let params: Vec<&str> = op.parameters.iter().map(|p| p.name.as_str()).collect();
            println!("  -{:6} {:28} {}", op.keyword, op.name, params.join(","));
        }
    }
    if !registry.presets().is_empty() {
        println!();
        println!("Presets (-pn:<name>):");
        for preset in registry.presets() {
            println!("  {:28} {}", preset.name, preset.definition);
        }
    }
    println!();
    println!("Use 'catena operators <keyword>' for parameter details.");

    Ok(())
}
