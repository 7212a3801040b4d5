use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use slarn_core::{Autocomplete, Item, RawConfiguration, Template};
use slarn_http::HttpSource;

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "slarn",
    about = "Autocomplete engine driver: search, render and resolve selections",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Control configuration (TOML or JSON).
    /// Defaults to $SLARN_CONFIG, then ~/.config/slarn/config.toml.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Output in JSON format.
    #[arg(long, global = true)]
    json: bool,

    /// Debug logging on stderr (RUST_LOG takes precedence).
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the suggestions for a query.
    Search { query: String },

    /// Show every suggestion, as the "show all" button does.
    ShowAll,

    /// Render a template against an item.
    Render {
        /// Template with #field.path# placeholders.
        #[arg(long)]
        template: String,
        /// Item as a JSON object.
        #[arg(long)]
        item: String,
    },

    /// Resolve the selected item(s) for one or more ids.
    Select {
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

// ─── Main ────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Render { template, item } => {
            let item: Item = serde_json::from_str(&item).context("--item must be a JSON object")?;
            let view = Template::new(template).render(&item)?;
            if cli.json {
                print_json(&serde_json::json!({ "status": "ok", "data": view }))?;
            } else {
                println!("{view}");
            }
        }

        Commands::Search { query } => {
            let mut ac = open_control(cli.config)?;
            ac.on_key_up(&query);
            settle(&mut ac).await?;
            print_suggestions(&ac, cli.json)?;
        }

        Commands::ShowAll => {
            let mut ac = open_control(cli.config)?;
            ac.toggle_suggestions();
            settle(&mut ac).await?;
            print_suggestions(&ac, cli.json)?;
        }

        Commands::Select { ids } => {
            let mut ac = open_control(cli.config)?;
            let value = ids_to_value(&ids, ac.config().multiple)?;
            ac.set_selected_id(&value)?;
            settle(&mut ac).await?;

            let selected = ac.selected_item();
            if cli.json {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "selected_id": ac.selected_id(), "selected_item": selected },
                }))?;
            } else if selected.items().is_empty() {
                println!("No item matches: {}", ids.join(", "));
            } else {
                for item in selected.items() {
                    println!("{}", ac.render(item)?);
                }
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_control(config: Option<PathBuf>) -> Result<Autocomplete> {
    let path = config.unwrap_or_else(RawConfiguration::config_path);
    let raw = RawConfiguration::load_from(&path)
        .with_context(|| format!("loading configuration from {}", path.display()))?;
    let source = HttpSource::new()?;
    Ok(Autocomplete::with_source(raw, Arc::new(source))?)
}

/// Drain outstanding remote work so the control reflects the final state.
async fn settle(ac: &mut Autocomplete) -> Result<()> {
    while ac.has_pending_remote() {
        ac.process_remote().await?;
    }
    Ok(())
}

fn print_suggestions(ac: &Autocomplete, json: bool) -> Result<()> {
    if json {
        return print_json(&serde_json::json!({
            "status": "ok",
            "data": { "items": ac.suggestions(), "total": ac.suggestions().len() },
        }));
    }

    if ac.suggestions().is_empty() {
        println!("{}", ac.empty_list_view());
        return Ok(());
    }
    for (index, item) in ac.suggestions().iter().enumerate() {
        println!("{index:>3}  {}", ac.render(item)?);
    }
    Ok(())
}

fn print_json(val: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(val)?);
    Ok(())
}

/// Command-line ids are JSON scalars when they parse as such, else strings.
fn parse_id_arg(arg: &str) -> Value {
    match serde_json::from_str::<Value>(arg) {
        Ok(v @ (Value::Number(_) | Value::String(_))) => v,
        _ => Value::String(arg.to_string()),
    }
}

fn ids_to_value(ids: &[String], multiple: bool) -> Result<Value> {
    match ids {
        [] => bail!("at least one id is required"),
        [single] if !multiple => Ok(parse_id_arg(single)),
        many => Ok(Value::Array(many.iter().map(|s| parse_id_arg(s)).collect())),
    }
}
