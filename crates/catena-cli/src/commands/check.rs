//! Chain string validation command.

use super::common::{ParamInfo, describe_params, print_param_table};
use catena_config::{ParseError, parse_chain};
use catena_core::{Chain, ControllerTarget, Operator};
use catena_registry::Registry;
use clap::Args;
use serde::Serialize;

#[derive(Args)]
pub struct CheckArgs {
    /// Chain string, e.g. "-ea:120 -kos:1,0,100,0.5,0 -efl:4000"
    #[arg(value_name = "CHAIN", allow_hyphen_values = true)]
    chain: String,

    /// Input channel count used to report the output channel count
    #[arg(long, default_value = "2")]
    channels: usize,

    /// Print JSON instead of tables
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct OperatorReport {
    index: usize,
    keyword: String,
    name: String,
    parameters: Vec<ParamInfo>,
}

#[derive(Debug, Serialize)]
struct ControllerReport {
    index: usize,
    keyword: String,
    name: String,
    target: String,
    parameters: Vec<ParamInfo>,
}

#[derive(Debug, Serialize)]
struct ChainReport {
    chain: String,
    input_channels: usize,
    output_channels: usize,
    operators: Vec<OperatorReport>,
    controllers: Vec<ControllerReport>,
}

/// Two-line rendering of `text` with a caret under the error position.
pub fn point_at(text: &str, err: &ParseError) -> String {
    let column = text
        .get(..err.position())
        .map_or(0, |prefix| prefix.chars().count());
    format!("  {text}\n  {}^", " ".repeat(column))
}

fn describe_target(chain: &Chain, target: Option<ControllerTarget>) -> String {
    match target {
        Some(ControllerTarget::Operator(id)) => chain
            .operator_index(id)
            .map_or_else(|| "detached".to_string(), |i| format!("operator {i}")),
        Some(ControllerTarget::Controller(id)) => chain
            .controller_index(id)
            .map_or_else(|| "detached".to_string(), |i| format!("controller c{i}")),
        None => "detached".to_string(),
    }
}

fn report(chain: &Chain, channels: usize) -> ChainReport {
    let operators = (1..=chain.number_of_chain_operators())
        .filter_map(|i| {
            let op = chain.chain_operator(i)?;
            Some(OperatorReport {
                index: i,
                keyword: op.keyword().to_string(),
                name: op.name().to_string(),
                parameters: describe_params(op, true),
            })
        })
        .collect();
    let controllers = (1..=chain.number_of_controllers())
        .filter_map(|i| {
            let ctrl = chain.controller(i)?;
            Some(ControllerReport {
                index: i,
                keyword: ctrl.keyword().to_string(),
                name: ctrl.name().to_string(),
                target: describe_target(chain, chain.controller_target(i)),
                parameters: describe_params(ctrl, true),
            })
        })
        .collect();
    ChainReport {
        chain: chain.to_string(),
        input_channels: channels,
        output_channels: chain.output_channels(channels),
        operators,
        controllers,
    }
}

pub fn run(args: CheckArgs, registry: &Registry) -> anyhow::Result<()> {
    let chain = match parse_chain(&args.chain, registry) {
        Ok(chain) => chain,
        Err(err) => {
            eprintln!("{}", point_at(&args.chain, &err));
            anyhow::bail!("invalid chain: {err}");
        }
    };
    tracing::info!(
        operators = chain.number_of_chain_operators(),
        controllers = chain.number_of_controllers(),
        "chain parsed"
    );

    let report = report(&chain, args.channels);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", report.chain);
    println!();
    println!(
        "Channels: {} in, {} out",
        report.input_channels, report.output_channels
    );

    if !report.operators.is_empty() {
        println!();
        println!("Operators:");
        for op in &report.operators {
            println!("  {}. {} (-{})", op.index, op.name, op.keyword);
            print_param_table(&op.parameters, "Value", 5);
        }
    }

    if !report.controllers.is_empty() {
        println!();
        println!("Controllers:");
        for ctrl in &report.controllers {
            println!(
                "  c{}. {} (-{}) -> {}",
                ctrl.index, ctrl.name, ctrl.keyword, ctrl.target
            );
            print_param_table(&ctrl.parameters, "Value", 5);
        }
    }

    Ok(())
}
