use capstone::config::Config;
use capstone::model::{ProjectFilter, Scope};
use capstone::store::Store;
use capstone::{checks, display, export, http};
use clap::{Parser, Subcommand};
use eyre::{WrapErr, ensure};
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{Level, info};

#[derive(Parser)]
#[command(version, author, about)]
struct Options {
    #[arg(short, long, value_name = "FILE")]
    /// Use FILE instead of capstone.toml
    config: Option<PathBuf>,
    #[arg(short, long, action = clap::ArgAction::Count)]
    /// Set verbosity level
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API
    Serve,
    /// Build panels from faculty specializations
    AutoCreate {
        #[arg(short, long = "department", required = true)]
        departments: Vec<String>,
        #[arg(short, long)]
        school: String,
        #[arg(short = 'y', long)]
        academic_year: String,
        #[arg(long)]
        /// Members per panel (defaults to the configured size)
        panel_size: Option<usize>,
        #[arg(short = 'n', long)]
        /// Do not write panels to the database
        dry_run: bool,
    },
    /// Give unassigned projects of a department a panel
    AutoAssign {
        #[arg(short = 'y', long)]
        academic_year: String,
        #[arg(short, long)]
        school: String,
        #[arg(short, long)]
        department: String,
        #[arg(short = 'n', long)]
        /// Do not write assignments to the database
        dry_run: bool,
    },
    /// Compare panel counters with assigned projects
    Check {
        #[arg(long)]
        /// Reset drifting counters
        fix: bool,
    },
    /// Write projects as CSV
    Export {
        #[arg(short = 'y', long)]
        academic_year: Option<String>,
        #[arg(short, long)]
        school: Option<String>,
        #[arg(short, long)]
        department: Option<String>,
        #[arg(short, long, value_name = "FILE")]
        /// Write to FILE instead of the standard output
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let options = Options::parse();
    let level = match options.verbose {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        3 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt().with_max_level(level).init();
    let config = Config::load(options.config.as_deref())?;
    let store = Store::connect(&config.database, config.panels)
        .await
        .wrap_err_with(|| format!("cannot open database {}", config.database.url))?;
    match options.command {
        Command::Serve => {
            let addr = config.server.bind_addr();
            http::serve(&addr, store)
                .await
                .wrap_err_with(|| format!("cannot serve on {addr}"))?;
        }
        Command::AutoCreate {
            departments,
            school,
            academic_year,
            panel_size,
            dry_run,
        } => {
            let size = panel_size.unwrap_or(config.panels.default_size);
            let report = store
                .auto_create_panels(&departments, &school, &academic_year, size, None, dry_run)
                .await?;
            display::display_report(&report, dry_run);
        }
        Command::AutoAssign {
            academic_year,
            school,
            department,
            dry_run,
        } => {
            let scope = Scope::new(&academic_year, &school, &department);
            let report = store.auto_assign_panels(&scope, None, dry_run).await?;
            display::display_report(&report, dry_run);
            ensure!(
                report.errors == 0,
                "{} projects could not get a panel",
                report.errors
            );
        }
        Command::Check { fix } => {
            let drifts = checks::check_panel_counters(&store, fix).await?;
            display::display_drifts(&drifts, fix);
            ensure!(
                fix || drifts.is_empty(),
                "{} panel counters are inconsistent",
                drifts.len()
            );
        }
        Command::Export {
            academic_year,
            school,
            department,
            output,
        } => {
            let filter = ProjectFilter {
                academic_year,
                school,
                department,
                ..ProjectFilter::default()
            };
            let out: Box<dyn Write> = match &output {
                Some(path) => Box::new(
                    File::create(path).wrap_err_with(|| format!("cannot create {}", path.display()))?,
                ),
                None => Box::new(io::stdout()),
            };
            let written = export::export_projects(&store, &filter, out).await?;
            info!(projects = written, "projects_exported");
        }
    }
    Ok(())
}
