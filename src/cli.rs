//! The command line interface for the optimiser.
use crate::input::load_project;
use crate::log;
use crate::output::metadata::write_metadata;
use crate::output::{DataWriter, create_output_directory, get_output_dir};
use crate::project::Project;
use crate::project::report::Report;
use crate::settings::Settings;
use crate::solver::SolverSession;
use ::log::{info, warn};
use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};

pub mod example;
use example::ExampleSubcommands;
pub mod settings;
use settings::SettingsSubcommands;

/// The command line interface for the optimiser.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Option<Commands>,
    /// Flag to provide the CLI docs as markdown
    #[arg(long, hide = true)]
    markdown_help: bool,
}

/// Options for the run command
#[derive(Args, Default)]
pub struct RunOpts {
    /// Directory for output files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Whether to overwrite the output directory if it already exists
    #[arg(long)]
    pub overwrite: bool,
    /// Whether to write big-M diagnostics to CSV files
    #[arg(long)]
    pub debug_model: bool,
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Size an installation for a project.
    Run {
        /// Path to the project directory.
        project_dir: PathBuf,
        /// Other run options
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Manage example projects.
    Example {
        /// The available subcommands for managing example projects.
        #[command(subcommand)]
        subcommand: ExampleSubcommands,
    },
    /// Validate a project.
    Validate {
        /// The path to the project directory.
        project_dir: PathBuf,
    },
    /// Manage program settings.
    Settings {
        /// The subcommands for managing settings.
        #[command(subcommand)]
        subcommand: SettingsSubcommands,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Run { project_dir, opts } => handle_run_command(&project_dir, &opts, None),
            Self::Example { subcommand } => subcommand.execute(),
            Self::Validate { project_dir } => handle_validate_command(&project_dir, None),
            Self::Settings { subcommand } => subcommand.execute(),
        }
    }
}

/// Parse CLI arguments and start the program
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Invoked as: `$ offgrid --markdown-help`
    if cli.markdown_help {
        clap_markdown::print_help_markdown::<Cli>();
        return Ok(());
    }

    let Some(command) = cli.command else {
        let help_str = Cli::command().render_long_help().to_string();
        println!("{help_str}");
        return Ok(());
    };

    command.execute()
}

/// Handle the `run` command.
pub fn handle_run_command(
    project_path: &Path,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<()> {
    // Load program settings, if not provided
    let mut settings = if let Some(settings) = settings {
        settings
    } else {
        Settings::load().context("Failed to load settings.")?
    };

    // These settings can be overridden by command-line arguments
    if opts.overwrite {
        settings.overwrite = true;
    }
    if opts.debug_model {
        settings.debug_model = true;
    }

    // Get path to output folder
    let pathbuf: PathBuf;
    let output_path = if let Some(p) = opts.output_dir.as_deref() {
        p
    } else {
        pathbuf = get_output_dir(project_path)?;
        &pathbuf
    };

    let overwrite =
        create_output_directory(output_path, settings.overwrite).with_context(|| {
            format!(
                "Failed to create output directory: {}",
                output_path.display()
            )
        })?;

    // Initialise program logger
    log::init(Some(&settings.log_level), Some(output_path))
        .context("Failed to initialise logging.")?;

    let loaded = load_project(project_path).context("Failed to load project.")?;
    info!("Loaded project from {}", project_path.display());
    info!("Output folder: {}", output_path.display());

    // NB: We have to wait until the logger is initialised to display this warning
    if overwrite {
        warn!("Output folder will be overwritten");
    }

    let session = SolverSession::new(loaded.config.solver.clone());
    let model = session.create_model(&loaded.config.location);
    let mut project = Project::build(model, loaded.inputs).context("Failed to build project.")?;
    project.optimize().context("Failed to optimise project.")?;
    let report = project.report()?;
    log_report(&report);

    let mut writer = DataWriter::create(output_path, settings.debug_model)?;
    writer.write_report(&report)?;
    writer.write_debug_info(project.big_m_links(), project.solution()?)?;
    writer.flush()?;
    write_metadata(
        output_path,
        project_path,
        &loaded.config.location,
        project.solution()?.objective_value(),
    )?;
    info!("Run complete!");

    Ok(())
}

/// Summarise the chosen installation in the log
fn log_report(report: &Report) {
    if report.selected_products.is_empty() {
        info!("No products were selected");
    }
    for product in &report.selected_products {
        info!(
            "Install {} x {} ({}, {} capacity)",
            product.units, product.product_id, product.energy_type, product.installed_capacity
        );
    }

    if report.grid.installed {
        info!(
            "Grid connection used: {} bought, {} sold",
            report.grid.total_usage, report.grid.total_sold
        );
    }

    let costs = &report.costs;
    info!(
        "Costs: opening {}, incremental {}, maintenance {} per month, grid {}, revenue {}",
        costs.opening, costs.incremental, costs.maintenance, costs.grid, costs.revenue
    );
    info!("Net total cost: {}", costs.net_total);
}

/// Handle the `validate` command.
pub fn handle_validate_command(project_path: &Path, settings: Option<Settings>) -> Result<()> {
    // Load program settings, if not provided
    let settings = if let Some(settings) = settings {
        settings
    } else {
        Settings::load().context("Failed to load settings.")?
    };

    // Initialise program logger (we won't save log files when running the validate command)
    log::init(Some(&settings.log_level), None).context("Failed to initialise logging.")?;

    // Load the project and formulate it, without solving
    let loaded = load_project(project_path).context("Failed to validate project.")?;
    let session = SolverSession::new(loaded.config.solver.clone());
    let model = session.create_model(&loaded.config.location);
    let project = Project::build(model, loaded.inputs).context("Failed to validate project.")?;
    let (demand, product, budget) = project.num_constraints();
    info!(
        "Project validation successful! ({} constraints)",
        demand + product + budget
    );

    Ok(())
}
