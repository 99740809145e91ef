mod config;
mod error;
mod export;
mod parser;
mod pipeline;
mod record;
mod store;
mod transport;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::warn;

use crate::config::{Settings, TransportKind};
use crate::pipeline::{Pipeline, RunConfig, RunSummary};
use crate::transport::http::{HttpOptions, HttpTransport};
use crate::transport::replay::ReplayTransport;

#[derive(Parser)]
#[command(
    name = "hellowork_scraper",
    about = "Hello Work job listing scraper (CSV store, optional workbook)"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the live site and page through every result
    Run {
        #[command(flatten)]
        opts: RunOpts,
        /// How to talk to the site (default from settings: http)
        #[arg(long, value_enum)]
        transport: Option<TransportKind>,
    },
    /// Run the same pipeline over saved result pages, one file per page
    Extract {
        /// Saved result pages, in page order
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// URL the pages were served from; links resolve against it
        #[arg(long, default_value = crate::config::INITIAL_PAGE_URL)]
        base_url: String,
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Rebuild the workbook from an existing CSV store
    Export {
        /// Settings file (default: ./hellowork.toml if present)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Output directory holding the store
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
}

#[derive(Args)]
struct RunOpts {
    /// Stop after this many pages (default: all)
    #[arg(short = 'n', long, visible_alias = "debug")]
    max_pages: Option<usize>,
    /// Keep raw fields only, skip normalization
    #[arg(long)]
    no_clean: bool,
    /// Output directory (default: output)
    #[arg(long)]
    out_dir: Option<PathBuf>,
    /// Do not convert the store to a workbook afterwards
    #[arg(long)]
    no_excel: bool,
    /// Settings file (default: ./hellowork.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,
}

impl RunOpts {
    fn settings(&self) -> anyhow::Result<Settings> {
        let mut s = Settings::load(self.config.as_deref())?;
        if self.max_pages.is_some() {
            s.max_pages = self.max_pages;
        }
        if self.no_clean {
            s.normalize = false;
        }
        if let Some(dir) = &self.out_dir {
            s.output_dir = dir.clone();
        }
        if self.no_excel {
            s.convert_to_excel = false;
        }
        Ok(s)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();
    pipeline::install_panic_hook();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let code = match cli.command {
        Commands::Run { opts, transport } => {
            let mut settings = opts.settings()?;
            if let Some(kind) = transport {
                settings.transport = kind;
            }
            let run = settings.run_config();
            println!(
                "Scraping {} ({:?} transport, normalize: {})...",
                run.initial_url, settings.transport, run.normalize
            );
            let summary = match settings.transport {
                TransportKind::Http => {
                    let t = HttpTransport::new(HttpOptions::from_settings(&settings))?;
                    Pipeline::new(t, run).run().await
                }
                TransportKind::Browser => run_browser(run).await?,
            };
            finish(&settings, summary)
        }
        Commands::Extract {
            files,
            base_url,
            opts,
        } => {
            let settings = opts.settings()?;
            let t = ReplayTransport::from_paths(&files, &base_url)
                .context("Failed to read saved pages")?;
            println!("Extracting {} saved pages...", files.len());
            let summary = Pipeline::new(t, settings.run_config()).run().await;
            finish(&settings, summary)
        }
        Commands::Export { config, out_dir } => {
            let mut settings = Settings::load(config.as_deref())?;
            if let Some(dir) = out_dir {
                settings.output_dir = dir;
            }
            let book = settings.excel_path();
            let written = export::export_workbook(
                &settings.csv_path(),
                &book,
                &settings.schema().columns(),
            )?;
            if written {
                println!("Workbook: {}", display_path(&book));
            } else {
                println!("Workbook export is not available in this build.");
            }
            ExitCode::SUCCESS
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    Ok(code)
}

#[cfg(feature = "browser")]
async fn run_browser(run: RunConfig) -> anyhow::Result<RunSummary> {
    let t = transport::browser::BrowserTransport::new();
    Ok(Pipeline::new(t, run).run().await)
}

#[cfg(not(feature = "browser"))]
async fn run_browser(_run: RunConfig) -> anyhow::Result<RunSummary> {
    anyhow::bail!("browser transport needs a build with `--features browser`")
}

/// Print the run report, convert the store if asked, and pick the exit code.
fn finish(settings: &Settings, summary: RunSummary) -> ExitCode {
    println!("Pages:   {}", summary.pages);
    println!("Records: {}", summary.records);
    if summary.skipped > 0 {
        println!("Skipped: {} listings could not be read", summary.skipped);
    }
    match &summary.outcome {
        Ok(reason) => println!("Stopped: {}", reason),
        Err(e) if e.is_configuration() => {
            eprintln!("Configuration error: {}", e);
            eprintln!("Nothing was scraped. Check the search page layout and settings.");
        }
        Err(e) => println!("Failed:  {} (records so far are kept)", e),
    }
    println!("Store:   {}", display_path(&summary.store_path));

    if !summary.produced_records() {
        return ExitCode::FAILURE;
    }

    if settings.convert_to_excel {
        let book = settings.excel_path();
        match export::export_workbook(&summary.store_path, &book, &settings.schema().columns()) {
            Ok(true) => println!("Workbook: {}", display_path(&book)),
            Ok(false) => {}
            Err(e) => warn!("Workbook export failed: {:#}", e),
        }
    }
    ExitCode::SUCCESS
}

fn display_path(p: &Path) -> String {
    std::path::absolute(p)
        .unwrap_or_else(|_| p.to_path_buf())
        .display()
        .to_string()
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
