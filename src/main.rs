use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use licea_analyzer::analyzer::rank_schools;
use licea_analyzer::loader::ThresholdLoader;
use licea_analyzer::models::{normalize_profile, Config, DEFAULT_DATA_FILE};
use licea_analyzer::points;
use licea_analyzer::report;
use licea_analyzer::scraper::{write_csv, ThresholdScraper};
use licea_analyzer::share::SharedState;
use licea_analyzer::telemetry;
use std::fs;
use std::path::Path;

/// `--profile` value that disables the profile filter.
const ALL_PROFILES: &str = "all";

fn rank_args() -> Vec<Arg> {
    vec![
        Arg::new("state")
            .long("state")
            .value_name("QUERY")
            .help("Shared state query string overriding the configured input and filter"),
        Arg::new("profile")
            .short('p')
            .long("profile")
            .value_name("PROFILE")
            .help("Only rank classes with this profile ('all' disables the filter)"),
        Arg::new("school")
            .short('s')
            .long("school")
            .value_name("SCHOOL")
            .action(ArgAction::Append)
            .help("Only rank this school (repeatable)"),
        Arg::new("points")
            .long("points")
            .value_name("POINTS")
            .value_parser(value_parser!(f64))
            .help("Rank against this score instead of the calculated one"),
    ]
}

fn cli() -> Command {
    Command::new("licea-analyzer")
        .version("1.0")
        .about("Calculates admission points and ranks schools by their thresholds")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config.toml")
                .global(true),
        )
        .args(rank_args())
        .subcommand(
            Command::new("rank")
                .about("Rank schools against the calculated points (default)")
                .args(rank_args()),
        )
        .subcommand(Command::new("profiles").about("List class profiles found in the data"))
        .subcommand(
            Command::new("share")
                .about("Print the shareable query string for the current input")
                .args(rank_args()),
        )
        .subcommand(
            Command::new("scrape")
                .about("Convert a threshold listing page into the CSV input file")
                .arg(
                    Arg::new("input")
                        .short('i')
                        .long("input")
                        .value_name("FILE|URL")
                        .required(true)
                        .help("Saved HTML page or its URL"),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .value_name("FILE")
                        .default_value(DEFAULT_DATA_FILE)
                        .help("CSV file to write"),
                ),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    let config_file = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or("config.toml");

    match matches.subcommand() {
        Some(("scrape", sub)) => scrape(sub).await,
        Some((command, sub)) => {
            let Some(config) = load_config(config_file)? else {
                return Ok(());
            };
            telemetry::init(&config.log_level)?;
            match command {
                "profiles" => list_profiles(&config).await,
                "share" => share(&config, sub),
                _ => rank(&config, sub).await,
            }
        }
        None => {
            let Some(config) = load_config(config_file)? else {
                return Ok(());
            };
            telemetry::init(&config.log_level)?;
            rank(&config, &matches).await
        }
    }
}

/// Loads the configuration, or writes a default one and asks the user to review it.
fn load_config(config_file: &str) -> Result<Option<Config>> {
    if Path::new(config_file).exists() {
        println!("📋 Loading configuration from: {}", config_file);
        let config = Config::load_from_file(config_file)
            .with_context(|| format!("Failed to read configuration: {}", config_file))?;
        Ok(Some(config))
    } else {
        println!("📝 Creating default configuration file: {}", config_file);
        Config::default().save_to_file(config_file)?;
        println!(
            "⚠️  Please review {} (grades, exam results, data source), then run the program again.",
            config_file
        );
        Ok(None)
    }
}

fn resolve_state(config: &Config, matches: &ArgMatches) -> SharedState {
    let mut state = SharedState {
        input: config.calculator.clamped(),
        filter: config.filter.clone(),
        points: None,
    };

    if let Some(query) = matches.get_one::<String>("state") {
        match SharedState::decode(query) {
            Some(decoded) => state = decoded,
            None => println!("⚠️  Shared state not recognized, using configuration values"),
        }
    }

    if let Some(profile) = matches.get_one::<String>("profile") {
        state.filter.profile = if profile.trim().eq_ignore_ascii_case(ALL_PROFILES) {
            None
        } else {
            Some(normalize_profile(profile.trim()))
        };
    }

    if let Some(schools) = matches.get_many::<String>("school") {
        state.filter.schools = schools.cloned().collect();
    }

    if let Some(points) = matches.get_one::<f64>("points") {
        state.points = Some(*points);
    }

    state
}

async fn rank(config: &Config, matches: &ArgMatches) -> Result<()> {
    let state = resolve_state(config, matches);
    let source = config.data_source()?;
    let output_dir = config.output_directory.as_deref().unwrap_or("output");

    println!("📂 Reading thresholds from: {}", source.location());
    let dataset = match ThresholdLoader::new().load_dataset(&source).await {
        Ok(dataset) => dataset,
        Err(e) => {
            println!("❌ {}", e);
            println!("   Make sure the threshold CSV exists and data_source_mode points at it.");
            return Err(e.into());
        }
    };
    println!(
        "   ✅ Found {} classes with {} distinct profiles",
        dataset.schools.len(),
        dataset.profiles.len()
    );

    if let Some(profile) = &state.filter.profile {
        if !dataset.profiles.iter().any(|p| &p.name == profile) {
            println!("⚠️  Profile '{}' does not occur in the data", profile);
        }
    }

    let breakdown = points::breakdown(&state.input);
    let ranking_points = state.points.unwrap_or(breakdown.total);
    if state.points.is_some() {
        println!("🎯 Ranking against {:.2} points", ranking_points);
    }

    let ranking = rank_schools(&dataset.schools, ranking_points, &state.filter);

    println!("\n{}", report::summary_text(&breakdown, &ranking));

    fs::create_dir_all(output_dir)?;
    report::generate_summary_report(&breakdown, &ranking, output_dir)?;
    report::generate_ranking_csv(&ranking, output_dir)?;

    println!("🔗 Share: ?{}", state.encode());
    println!("📄 Reports written to: {}", output_dir);
    Ok(())
}

async fn list_profiles(config: &Config) -> Result<()> {
    let source = config.data_source()?;
    let dataset = ThresholdLoader::new().load_dataset(&source).await?;

    println!("🏷️  Profiles in {}:", source.location());
    for profile in &dataset.profiles {
        println!("   - {} ({})", profile.original, profile.name);
    }
    Ok(())
}

fn share(config: &Config, matches: &ArgMatches) -> Result<()> {
    let state = resolve_state(config, matches);
    println!("?{}", state.encode());
    Ok(())
}

async fn scrape(matches: &ArgMatches) -> Result<()> {
    telemetry::init("info")?;

    let input = matches
        .get_one::<String>("input")
        .context("missing --input")?;
    let output = matches
        .get_one::<String>("output")
        .map(String::as_str)
        .unwrap_or(DEFAULT_DATA_FILE);

    let listing_scraper = ThresholdScraper::new();
    let classes = if input.starts_with("http://") || input.starts_with("https://") {
        println!("🌐 Fetching listing from: {}", input);
        listing_scraper.scrape_url(input).await?
    } else {
        println!("📄 Processing: {}", input);
        listing_scraper.scrape_file(input)?
    };

    let file = fs::File::create(output)
        .with_context(|| format!("Failed to create output file: {}", output))?;
    write_csv(&classes, file)?;

    println!("   ✅ Saved {} classes to {}", classes.len(), output);
    Ok(())
}
