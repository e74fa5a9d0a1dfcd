//! Controller source listing command.

use super::common::{ParamInfo, describe_params, print_param_table};
use catena_registry::Registry;
use clap::Args;
use serde::Serialize;

#[derive(Args)]
pub struct ControllersArgs {
    /// Show details for one controller keyword (e.g. "kos")
    #[arg(value_name = "KEYWORD")]
    keyword: Option<String>,

    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct ControllerListing {
    keyword: &'static str,
    name: &'static str,
    description: &'static str,
    /// Full clause parameters: param-id, range-low, range-high, then the
    /// source's own.
    parameters: Vec<ParamInfo>,
}

pub fn run(args: ControllersArgs, registry: &Registry) -> anyhow::Result<()> {
    let controllers = registry.controllers();

    let descriptors = match &args.keyword {
        Some(keyword) => vec![
            controllers
                .get(keyword.trim_start_matches('-'))
                .ok_or_else(|| anyhow::anyhow!("Unknown controller: {}", keyword))?,
        ],
        None => controllers.all_controllers(),
    };

    let listings: Vec<ControllerListing> = descriptors
        .into_iter()
        .map(|desc| ControllerListing {
            keyword: desc.keyword,
            name: desc.name,
            description: desc.description,
            parameters: controllers
                .create(desc.keyword)
                .map(|ctrl| describe_params(&ctrl, false))
                .unwrap_or_default(),
        })
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&listings)?);
        return Ok(());
    }

    if args.keyword.is_some() {
        for ctrl in &listings {
            let title = format!("-{}  {}", ctrl.keyword, ctrl.name);
            println!("{title}");
            println!("{}", "=".repeat(title.len()));
            println!();
            println!("{}", ctrl.description);
            println!();
            println!("Parameters:");
            print_param_table(&ctrl.parameters, "Default", 2);
            println!();
            println!("Attach after an operator, or after '-kx' to control a controller:");
            println!("  catena check \"-ea:100 -{}:1,0,100\"", ctrl.keyword);
        }
        return Ok(());
    }

    println!("Controllers");
    println!("===========");
    println!();
    for ctrl in &listings {
        let params: Vec<&str> = ctrl.parameters.iter().map(|p| p.name.as_str()).collect();
        println!("  -{:5} {:28} {}", ctrl.keyword, ctrl.name, params.join(","));
    }
    println!();
    println!("Every controller clause starts with param-id, range-low, range-high.");
    println!("Use 'catena controllers <keyword>' for parameter details.");

    Ok(())
}
