//! Cohort query CLI
//!
//! Drives the cohort builder's search modes from the command line and prints
//! the resulting reporting query document followed by its description.

mod catalog;
mod config;
mod logging;
mod output;

use std::io::Read;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};
use chrono::{DateTime, Local, NaiveDate, TimeZone};
use clap::{Args, Parser, Subcommand};
use cohort_query::{compose, FilterParameters};
use cohort_search::{
    CohortStore, ConceptInput, ConceptSearch, EncounterMethod, EncounterSearch, LocationSearch,
    Notifier, OptionSource, Operator, SubmitHandler, TimeModifier, Timestamp,
};
use rust_decimal::Decimal;

use crate::catalog::{find_option, FileCatalog};
use crate::config::CliConfig;
use crate::output::ConsoleHandler;

#[derive(Parser)]
#[command(name = "cohort")]
#[command(about = "Build cohort builder reporting queries", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./cohort.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Option catalog JSON file; overrides the configured one
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Print the query document on a single line
    #[arg(long, global = true)]
    compact: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compose a query from raw row filter parameters
    Compose {
        /// JSON object of filterKey -> [{name, value}]; "-" reads stdin
        #[arg(long, default_value = "-")]
        input: String,

        /// Saved-search name
        #[arg(long, requires = "description")]
        name: Option<String>,

        /// Saved-search description
        #[arg(long, requires = "name")]
        description: Option<String>,
    },
    /// Patients seen at a location
    Location {
        /// FIRST, LAST or anything else for any encounter
        #[arg(long, default_value = "ANY")]
        method: String,

        /// Location uuid or name
        #[arg(long)]
        location: String,
    },
    /// Patients with observations of a concept
    Concepts(ConceptArgs),
    /// Patients with matching encounters
    Encounters(EncounterArgs),
}

#[derive(Args)]
struct ConceptArgs {
    /// Concept name to search for
    #[arg(long)]
    concept: String,

    #[arg(long, default_value_t = 0)]
    last_days: u32,

    #[arg(long, default_value_t = 0)]
    last_months: u32,

    /// LESS_THAN, LESS_EQUAL, EQUAL, GREATER_EQUAL, GREATER_THAN or a symbol
    #[arg(long, default_value = "LESS_THAN")]
    operator: Operator,

    /// Threshold for numeric concepts; 0 means none
    #[arg(long, allow_hyphen_values = true)]
    value: Option<Decimal>,

    #[arg(long, default_value = "ANY")]
    time_modifier: TimeModifier,

    /// Coded answer or text to match
    #[arg(long)]
    modifier: Option<String>,

    /// Range start (YYYY-MM-DD or RFC 3339)
    #[arg(long, requires = "until", value_parser = parse_date)]
    since: Option<Timestamp>,

    /// Range end (YYYY-MM-DD or RFC 3339)
    #[arg(long, requires = "since", value_parser = parse_date)]
    until: Option<Timestamp>,
}

#[derive(Args)]
struct EncounterArgs {
    /// Encounter type uuid or name; repeatable
    #[arg(long = "encounter-type")]
    encounter_types: Vec<String>,

    /// Form uuid or name
    #[arg(long)]
    form: Option<String>,

    /// Location uuid or name
    #[arg(long)]
    location: Option<String>,

    #[arg(long, default_value_t = 0)]
    at_least: u32,

    #[arg(long, default_value_t = 0)]
    at_most: u32,

    #[arg(long, requires = "until", value_parser = parse_date)]
    since: Option<Timestamp>,

    #[arg(long, requires = "since", value_parser = parse_date)]
    until: Option<Timestamp>,
}

fn parse_date(s: &str) -> Result<Timestamp, String> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts);
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| format!("invalid date '{s}': {e}"))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| format!("invalid date '{s}'"))?;
    Local
        .from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.fixed_offset())
        .ok_or_else(|| format!("'{s}' does not exist in the local timezone"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            eprintln!("Warning: Failed to load .env file: {e}");
        }
    }

    let cli = Cli::parse();
    let config = CliConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    logging::init_logging(&config.logging);

    let handler = ConsoleHandler::new(config.pretty && !cli.compact);
    let catalog_path = cli.catalog.clone().or(config.catalog.clone());
    let store = CohortStore::new();

    let accepted = match cli.command {
        Commands::Compose {
            input,
            name,
            description,
        } => run_compose(&handler, &input, name, description).await?,
        Commands::Location { method, location } => {
            let catalog = open_catalog(catalog_path)?;
            run_location(&handler, &catalog, &store, &method, &location).await?
        }
        Commands::Concepts(args) => {
            let catalog = open_catalog(catalog_path)?;
            run_concepts(&handler, &catalog, args).await?
        }
        Commands::Encounters(args) => {
            let catalog = open_catalog(catalog_path)?;
            run_encounters(&handler, &catalog, &store, args).await?
        }
    };

    if !accepted {
        bail!("Search was not accepted");
    }
    Ok(())
}

fn open_catalog(path: Option<PathBuf>) -> anyhow::Result<FileCatalog> {
    let path = path.ok_or_else(|| {
        anyhow!("No option catalog configured (pass --catalog or set `catalog` in cohort.toml)")
    })?;
    Ok(FileCatalog::new(path))
}

async fn run_compose(
    handler: &ConsoleHandler,
    input: &str,
    name: Option<String>,
    description: Option<String>,
) -> anyhow::Result<bool> {
    let raw = if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read parameters from stdin")?;
        buf
    } else {
        tokio::fs::read_to_string(input)
            .await
            .with_context(|| format!("Failed to read {input}"))?
    };
    let params: FilterParameters =
        serde_json::from_str(&raw).context("Invalid row filter parameters")?;

    let mut search_params = compose(&params);
    let summary = match (name, description) {
        (Some(name), Some(description)) => {
            search_params = search_params.with_name(name, description.clone());
            description
        }
        _ => format!("{} row filter(s)", params.len()),
    };

    Ok(handler.on_submit(search_params, summary).await)
}

async fn run_location(
    handler: &ConsoleHandler,
    catalog: &FileCatalog,
    store: &CohortStore,
    method: &str,
    location: &str,
) -> anyhow::Result<bool> {
    let mut search = LocationSearch::new();
    search.load_options(catalog, store).await;
    report_notification(store);

    let selected = find_option(search.locations(), location)
        .cloned()
        .ok_or_else(|| anyhow!("Unknown location '{location}'"))?;
    search.set_method(EncounterMethod::from(method));
    search.select_location(selected);

    Ok(search.submit(handler).await?)
}

async fn run_concepts(
    handler: &ConsoleHandler,
    catalog: &FileCatalog,
    args: ConceptArgs,
) -> anyhow::Result<bool> {
    let matches = catalog
        .search_concepts(&args.concept)
        .await
        .with_context(|| format!("Failed to look up concept '{}'", args.concept))?;
    let concept = matches
        .iter()
        .find(|c| c.name.eq_ignore_ascii_case(args.concept.trim()))
        .or_else(|| matches.first())
        .cloned()
        .ok_or_else(|| anyhow!("No concept matches '{}'", args.concept))?;
    tracing::info!(concept = %concept.name, uuid = %concept.uuid, "Using concept");

    let mut inputs = vec![
        ConceptInput::Concept(concept),
        ConceptInput::TimeModifier(args.time_modifier),
        ConceptInput::Operator(args.operator),
    ];
    if let Some(value) = args.value {
        inputs.push(ConceptInput::OperatorValue(value));
    }
    if let Some(modifier) = args.modifier {
        inputs.push(ConceptInput::Modifier(modifier));
    }
    if let (Some(start), Some(end)) = (args.since, args.until) {
        inputs.push(ConceptInput::DateRange { start, end });
    }
    inputs.push(ConceptInput::LastMonths(args.last_months));
    inputs.push(ConceptInput::LastDays(args.last_days));

    let mut search = ConceptSearch::new();
    let mut latest = None;
    for input in inputs {
        if let Some(emission) = search.apply(input)? {
            latest = Some(emission);
        }
    }
    let emission = latest.ok_or_else(|| anyhow!("Concept search produced no query"))?;

    Ok(handler
        .on_submit(emission.search_params, emission.description)
        .await)
}

async fn run_encounters(
    handler: &ConsoleHandler,
    catalog: &FileCatalog,
    store: &CohortStore,
    args: EncounterArgs,
) -> anyhow::Result<bool> {
    let mut search = EncounterSearch::new();
    search.load_options(catalog, store).await;
    report_notification(store);

    let options = search.options().clone();
    let encounter_types = args
        .encounter_types
        .iter()
        .map(|key| {
            find_option(&options.encounter_types, key)
                .cloned()
                .ok_or_else(|| anyhow!("Unknown encounter type '{key}'"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    search.select_encounter_types(encounter_types);

    if let Some(key) = &args.form {
        let form = find_option(&options.forms, key).ok_or_else(|| anyhow!("Unknown form '{key}'"))?;
        search.select_form(form.clone());
    }
    if let Some(key) = &args.location {
        let location = find_option(&options.locations, key)
            .ok_or_else(|| anyhow!("Unknown location '{key}'"))?;
        search.select_location(location.clone());
    }
    search.set_at_least_count(args.at_least);
    search.set_at_most_count(args.at_most);
    if let (Some(start), Some(end)) = (args.since, args.until) {
        search.set_date_range(start, end);
    }

    Ok(search.submit(handler).await?)
}

fn report_notification(store: &CohortStore) {
    if let Some(notification) = store.last_notification() {
        tracing::warn!(
            title = %notification.title,
            critical = notification.critical,
            "{}",
            notification.description
        );
    }
}
