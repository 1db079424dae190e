//! CLI command definitions for hackforge.
//!
//! Every command discovers the category registry from the configured
//! directories, runs synchronously, and prints a short report to stdout.

use std::path::PathBuf;

use anyhow::{bail, Context as _};
use clap::Parser;
use tracing::{info, warn};

use crate::config::ForgeConfig;
use crate::export::Exporter;
use crate::generator::Generator;
use crate::machine::MachineConfig;
use crate::registry::CategoryRegistry;

/// Deterministic vulnerable-machine generator.
#[derive(Parser)]
#[command(name = "hackforge")]
#[command(about = "Generate reproducible vulnerable machine configurations from blueprints")]
#[command(version)]
#[command(
    long_about = "hackforge turns vulnerability blueprints and a seed into deterministic machine configurations.\n\nExample usage:\n  hackforge generate --blueprint xss_001 --difficulty 2 --user alice\n  hackforge campaign --user alice --difficulty 3 --count 4"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,

    /// Directory containing `*_blueprint.yaml` declarations.
    #[arg(long, global = true)]
    pub blueprints_dir: Option<PathBuf>,

    /// Directory containing `*_mutation.yaml` engine manifests.
    #[arg(long, global = true)]
    pub engines_dir: Option<PathBuf>,

    /// Directory receiving single-machine exports.
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// Directory receiving campaign exports.
    #[arg(long, global = true)]
    pub campaigns_dir: Option<PathBuf>,
}

impl Cli {
    /// Builds the effective configuration: environment first, then flags.
    fn forge_config(&self) -> anyhow::Result<ForgeConfig> {
        let mut config = ForgeConfig::from_env().context("Invalid HACKFORGE_* environment")?;

        if let Some(dir) = &self.blueprints_dir {
            config = config.with_blueprints_dir(dir);
        }
        if let Some(dir) = &self.engines_dir {
            let dir = (!dir.as_os_str().is_empty()).then(|| dir.clone());
            config = config.with_engines_dir(dir);
        }
        if let Some(dir) = &self.output_dir {
            config = config.with_output_dir(dir);
        }
        if let Some(dir) = &self.campaigns_dir {
            config = config.with_campaigns_dir(dir);
        }

        config.validate()?;
        Ok(config)
    }
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// List loaded blueprints and their engines.
    #[command(alias = "ls")]
    List(ListArgs),

    /// Generate a single machine.
    #[command(alias = "gen")]
    Generate(GenerateArgs),

    /// Generate a campaign of machines from distinct blueprints.
    Campaign(CampaignArgs),

    /// Generate one machine for every blueprint.
    All(AllArgs),

    /// Report what discovery found and skipped.
    Check,
}

/// Arguments for `hackforge list`.
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Print the listing as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `hackforge generate`.
#[derive(Parser, Debug)]
pub struct GenerateArgs {
    /// Blueprint id or category; picked from the user and time when omitted.
    #[arg(short, long)]
    pub blueprint: Option<String>,

    /// Explicit seed; requires --blueprint.
    #[arg(short, long, requires = "blueprint")]
    pub seed: Option<String>,

    /// Difficulty from 1 to 5.
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=5))]
    pub difficulty: Option<u8>,

    /// User the machine is generated for.
    #[arg(short, long)]
    pub user: Option<String>,

    /// Print the configuration without writing files.
    #[arg(long)]
    pub no_export: bool,

    /// Print the full configuration as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `hackforge campaign`.
#[derive(Parser, Debug)]
pub struct CampaignArgs {
    /// User the campaign is generated for.
    #[arg(short, long)]
    pub user: Option<String>,

    /// Difficulty from 1 to 5.
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=5))]
    pub difficulty: Option<u8>,

    /// Number of machines.
    #[arg(short = 'n', long)]
    pub count: Option<usize>,

    /// Skip writing the campaign directory.
    #[arg(long)]
    pub no_export: bool,
}

/// Arguments for `hackforge all`.
#[derive(Parser, Debug)]
pub struct AllArgs {
    /// Difficulty from 1 to 5.
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=5))]
    pub difficulty: Option<u8>,

    /// User the machines are generated for.
    #[arg(short, long)]
    pub user: Option<String>,

    /// Skip writing machine directories.
    #[arg(long)]
    pub no_export: bool,
}

/// Parse CLI arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
pub fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli())
}

/// Run the CLI with the parsed arguments.
pub fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    let config = cli.forge_config()?;

    match cli.command {
        Commands::List(args) => run_list_command(&config, args),
        Commands::Generate(args) => run_generate_command(&config, args),
        Commands::Campaign(args) => run_campaign_command(&config, args),
        Commands::All(args) => run_all_command(&config, args),
        Commands::Check => run_check_command(&config),
    }
}

/// Discovers the registry and refuses to continue without a usable category.
fn usable_generator(config: &ForgeConfig) -> anyhow::Result<Generator> {
    let generator = Generator::from_config(config);
    if generator.registry().is_empty() {
        bail!(
            "No usable categories discovered in {} (run `hackforge check` for details)",
            config.blueprints_dir.display()
        );
    }
    Ok(generator)
}

fn run_list_command(config: &ForgeConfig, args: ListArgs) -> anyhow::Result<()> {
    let generator = Generator::from_config(config);
    let listing = generator.list_blueprints();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    if listing.is_empty() {
        println!("No blueprints found in {}", config.blueprints_dir.display());
        return Ok(());
    }

    println!("Available blueprints ({}):", listing.len());
    for summary in &listing {
        println!(
            "  {:<16} {:<28} category={} difficulty={}-{} variants={} engine={}",
            summary.blueprint_id,
            summary.name,
            summary.category,
            summary.difficulty_range.min,
            summary.difficulty_range.max,
            summary.variants.len(),
            summary.engine.as_deref().unwrap_or("none"),
        );
    }
    Ok(())
}

fn run_generate_command(config: &ForgeConfig, args: GenerateArgs) -> anyhow::Result<()> {
    let generator = usable_generator(config)?;
    let difficulty = args.difficulty.unwrap_or(config.default_difficulty);
    let user = args.user.as_deref().unwrap_or(&config.default_user);

    let machine = match (&args.blueprint, &args.seed) {
        (Some(key), Some(seed)) => generator.generate(key, seed, difficulty)?,
        _ => generator.generate_single(args.blueprint.as_deref(), difficulty, user)?,
    };

    if args.json {
        println!("{}", machine.to_json_pretty()?);
    } else {
        print_machine(&machine);
    }

    if !args.no_export {
        let dir = Exporter::from_config(config).export_machine(&machine)?;
        println!("✓ Exported to {}", dir.display());
    }
    Ok(())
}

fn run_campaign_command(config: &ForgeConfig, args: CampaignArgs) -> anyhow::Result<()> {
    let generator = usable_generator(config)?;
    let difficulty = args.difficulty.unwrap_or(config.default_difficulty);
    let user = args.user.as_deref().unwrap_or(&config.default_user);
    let count = args.count.unwrap_or(config.campaign_size);

    let campaign = generator.generate_campaign(user, difficulty, count)?;
    if campaign.is_partial() {
        warn!(
            requested = campaign.requested,
            generated = campaign.len(),
            "Campaign is smaller than requested"
        );
    }

    println!("Campaign {} for {} ({} machines)", campaign.campaign_id, user, campaign.len());
    for machine in &campaign.machines {
        println!(
            "  {}  {:<28} {} (difficulty {})",
            machine.machine_id,
            machine.display_name(),
            machine.variant,
            machine.difficulty
        );
    }

    if !args.no_export && !campaign.is_empty() {
        let dir = Exporter::from_config(config).export_campaign(&campaign)?;
        println!("✓ Exported to {}", dir.display());
    }
    Ok(())
}

fn run_all_command(config: &ForgeConfig, args: AllArgs) -> anyhow::Result<()> {
    let generator = usable_generator(config)?;
    let difficulty = args.difficulty.unwrap_or(config.default_difficulty);
    let user = args.user.as_deref().unwrap_or(&config.default_user);

    let machines = generator.generate_all(difficulty, user);
    let exporter = Exporter::from_config(config);

    for machine in &machines {
        print_machine(machine);
        if !args.no_export {
            let dir = exporter
                .export_machine(machine)
                .with_context(|| format!("Failed to export machine {}", machine.machine_id))?;
            println!("✓ Exported to {}", dir.display());
        }
    }

    info!(generated = machines.len(), "Generated machines for every blueprint");
    println!("Generated {} machine(s)", machines.len());
    Ok(())
}

fn run_check_command(config: &ForgeConfig) -> anyhow::Result<()> {
    let registry = CategoryRegistry::discover(&config.discovery_sources());
    let report = registry.report();

    println!("Blueprint directory: {}", config.blueprints_dir.display());
    match &config.engines_dir {
        Some(dir) => println!("Engine directory:    {}", dir.display()),
        None => println!("Engine directory:    (built-in engines only)"),
    }
    println!("Blueprint files:     {}", report.blueprint_files);
    println!("Manifest files:      {}", report.manifest_files);
    println!();

    println!("Usable categories ({}):", registry.len());
    for entry in registry.entries() {
        println!("  {:<24} {} -> {}", entry.category, entry.blueprint.blueprint_id, entry.engine);
    }

    let unmatched = registry.unmatched_blueprints();
    if !unmatched.is_empty() {
        println!("Blueprints without an engine:");
        for blueprint in unmatched {
            println!("  {} (category {})", blueprint.blueprint_id, blueprint.category);
        }
    }

    let idle = registry.idle_engines();
    if !idle.is_empty() {
        println!("Engines without a blueprint: {}", idle.join(", "));
    }

    if !report.skipped.is_empty() {
        println!("Skipped:");
        for skipped in &report.skipped {
            println!("  {}: {}", skipped.source, skipped.reason);
        }
    }

    if registry.is_empty() {
        bail!("No usable categories discovered");
    }
    Ok(())
}

fn print_machine(machine: &MachineConfig) {
    println!("Machine {}", machine.machine_id);
    println!("  Blueprint:  {}", machine.blueprint_id);
    println!("  Name:       {}", machine.display_name());
    println!("  Variant:    {}", machine.variant);
    println!("  Difficulty: {}/5", machine.difficulty);
    println!("  Context:    {}", machine.application.context);
    println!("  Seed:       {}", machine.seed);
    println!("  Flag:       {}", machine.flag.content);
    let filters = machine.constraints.filter_types();
    if filters.is_empty() {
        println!("  Filters:    none");
    } else {
        println!("  Filters:    {}", filters.join(", "));
    }
}
