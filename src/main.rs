//! site-mirror main entry point
//!
//! This is the command-line interface for mirroring a WordPress site into a
//! static tree.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use site_mirror::config::{load_config_with_hash, validate, Config, SourceKind};
use site_mirror::crawler::{HttpFetcher, Workflow};
use site_mirror::output::{print_summary, write_markdown_report, RunSummary};
use site_mirror::sitemap::{extract_sitemap_paths, find_sitemap_location};
use site_mirror::verify::verify_project;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// site-mirror: WordPress as a static site
///
/// Mirrors a live WordPress site, or the archive produced by its export
/// plugin, into a self-contained static tree with a search index, a 404
/// page, a robots policy and a redirect map.
#[derive(Parser, Debug)]
#[command(name = "site-mirror")]
#[command(version)]
#[command(about = "Mirror a WordPress site as a static site", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a batch for a TOML project file
    Mirror {
        /// Path to the TOML project file
        #[arg(value_name = "CONFIG")]
        config: PathBuf,

        /// Validate the project and show what would run, without fetching
        #[arg(long)]
        dry_run: bool,

        /// Write a markdown report of the run to this path
        #[arg(long, value_name = "PATH")]
        report: Option<PathBuf>,
    },

    /// Unpack the export archive of a site, configured from the environment
    Deploy {
        /// WordPress user name
        #[arg(long, env = "user")]
        user: String,

        /// WordPress application password
        #[arg(long, env = "token", hide_env_values = true)]
        token: String,

        /// Source WordPress URL
        #[arg(long, env = "src")]
        src: String,

        /// Destination URL of the static site
        #[arg(long, env = "dst")]
        dst: String,

        /// Directory name of the custom 404 page
        #[arg(long = "page-404", env = "404", default_value = "404-error")]
        page_404: String,

        /// Directory name of the search page
        #[arg(long, env = "search", default_value = "search")]
        search: String,

        /// Output directory
        #[arg(long, env = "output", default_value = "output")]
        output: PathBuf,
    },

    /// Locate and expand the sitemap of a site
    Sitemap {
        /// Home URL of the site
        #[arg(value_name = "URL")]
        url: String,
    },

    /// Check a project against the live site
    Verify {
        /// Path to the TOML project file
        #[arg(value_name = "CONFIG")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    match cli.command {
        Command::Mirror {
            config,
            dry_run,
            report,
        } => {
            let (config, hash) = load_project(&config)?;
            if dry_run {
                handle_dry_run(&config);
            } else {
                handle_mirror(config, Some(hash), report.as_deref()).await?;
            }
        }
        Command::Deploy {
            user,
            token,
            src,
            dst,
            page_404,
            search,
            output,
        } => {
            let config =
                Config::script_mode(&user, &token, &src, &dst, &page_404, &search, &output);
            validate(&config).context("Invalid deploy settings")?;
            handle_mirror(config, None, None).await?;
        }
        Command::Sitemap { url } => handle_sitemap(&url).await?,
        Command::Verify { config } => {
            let (config, _) = load_project(&config)?;
            handle_verify(&config).await?;
        }
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_mirror=info,warn"),
            1 => EnvFilter::new("site_mirror=debug,info"),
            2 => EnvFilter::new("site_mirror=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn load_project(path: &Path) -> anyhow::Result<(Config, String)> {
    tracing::info!("Loading project from: {}", path.display());
    let (config, hash) = load_config_with_hash(path)
        .with_context(|| format!("Failed to load project {}", path.display()))?;
    tracing::info!("Project loaded successfully (hash: {})", hash);
    Ok((config, hash))
}

/// Handles --dry-run: shows the project as it would run
fn handle_dry_run(config: &Config) {
    println!("=== site-mirror Dry Run ===\n");

    println!("Project: {}", config.name);
    println!("  Source: {} ({:?})", config.src_url(), config.source.kind);
    println!(
        "  Destination: {} ({:?})",
        config.dst_url(),
        config.destination.host
    );
    println!("  Output: {}", config.output().display());

    println!("\nCrawl:");
    match config.sitemap_url() {
        Some(sitemap) => println!("  Sitemap: {}", sitemap),
        None => println!("  Sitemap: located at run time"),
    }
    println!("  Delay: {}s, retries: {}", config.delay, config.retries);
    println!("  User agent: {}", config.user_agent_string());

    println!("\nAdditional URLs ({}):", config.additional.len());
    for url in &config.additional {
        println!("  - {}", url);
    }

    println!("\nExcluded ({}):", config.exclude.len());
    for entry in &config.exclude {
        println!("  - {}", entry);
    }

    let first = match config.source.kind {
        SourceKind::Archive => "archive",
        SourceKind::Crawl => "crawl",
    };
    println!("\nStages: {} -> 404 -> robots -> redirects -> search", first);

    println!("\nArtifacts:");
    println!("  404 page: {}", config.page_404_url());
    println!("  Search page: {}", config.search_path().display());
    println!("  Redirects: {}", config.redirects_file().display());

    println!("\n✓ Project is valid");
}

/// Runs a batch, cancelling it on Ctrl-C
async fn handle_mirror(
    config: Config,
    hash: Option<String>,
    report: Option<&Path>,
) -> anyhow::Result<()> {
    let mut workflow = Workflow::new(config).context("Failed to build HTTP client")?;
    if let Some(hash) = &hash {
        workflow.set_config_hash(hash);
    }

    let cancel = workflow.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let summary = workflow.batch_processing().await;
    finish(&summary, report)
}

fn finish(summary: &RunSummary, report: Option<&Path>) -> anyhow::Result<()> {
    print_summary(summary);

    if let Some(path) = report {
        write_markdown_report(summary, path)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        println!("✓ Report written to: {}", path.display());
    }

    if !summary.is_clean() {
        bail!(
            "Run {} with {} failed stage(s)",
            summary.state,
            summary.failed_stages.len()
        );
    }
    Ok(())
}

/// Handles the sitemap command: prints the sitemap and what it lists
async fn handle_sitemap(url: &str) -> anyhow::Result<()> {
    let mut config = Config::script_mode("", "", url, "", "404-error", "search", Path::new("."));
    let fetcher = HttpFetcher::new(&config).context("Failed to build HTTP client")?;

    let location = find_sitemap_location(config.src_url(), &fetcher, &config.settings).await;
    if location.is_empty() {
        bail!("No sitemap found for {}", url);
    }
    config.sitemap = location;

    let Some(sitemap_url) = config.sitemap_url() else {
        bail!("No sitemap found for {}", url);
    };
    println!("{}", sitemap_url);
    for path in extract_sitemap_paths(&sitemap_url, &fetcher).await {
        println!("  {}", path);
    }
    Ok(())
}

/// Handles the verify command
async fn handle_verify(config: &Config) -> anyhow::Result<()> {
    let fetcher = HttpFetcher::new(config).context("Failed to build HTTP client")?;
    let checks = verify_project(config, &fetcher).await;

    for check in &checks {
        println!("{}", check);
    }

    let failed = checks.iter().filter(|c| !c.passed).count();
    if failed > 0 {
        bail!("{} of {} checks failed", failed, checks.len());
    }
    println!("\n✓ All {} checks passed", checks.len());
    Ok(())
}
