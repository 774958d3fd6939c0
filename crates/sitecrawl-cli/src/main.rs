//! Sitecrawl CLI - crawl URL lists to markdown and extract sitemap URLs

use clap::{Parser, Subcommand, ValueEnum};
use sitecrawl::{load_sitemap, CrawlSummary, Crawler, MarkdownVariant, Sitemap, DEFAULT_OUTPUT_DIR};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Output format for reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON format
    Json,
}

/// Sitecrawl - batch web page to markdown crawler
#[derive(Parser, Debug)]
#[command(name = "sitecrawl")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Crawl every URL of a list and save each page as markdown
    Crawl {
        /// File with one URL per line
        urls_file: PathBuf,

        /// Directory the markdown files are written to
        #[arg(long, short, default_value = DEFAULT_OUTPUT_DIR)]
        output_dir: PathBuf,

        /// Custom User-Agent
        #[arg(long)]
        user_agent: Option<String>,

        /// Pause between requests, in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Stop reading a page after this many bytes
        #[arg(long)]
        max_page_bytes: Option<usize>,

        /// Skip the boilerplate pruning pass
        #[arg(long)]
        no_prune: bool,

        /// Write the pruned markdown instead of the full conversion
        #[arg(long)]
        fit: bool,

        /// Log request details for every page
        #[arg(long)]
        verbose: bool,

        /// Format of the final summary
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
    /// Extract page URLs from a sitemap XML file
    Sitemap {
        /// Local sitemap file
        sitemap: PathBuf,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        /// Also write the URLs to this file, one per line
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so stdout carries only results
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    match cli.command {
        Commands::Crawl {
            urls_file,
            output_dir,
            user_agent,
            delay_ms,
            max_page_bytes,
            no_prune,
            fit,
            verbose,
            format,
        } => {
            if !urls_file.exists() {
                eprintln!(
                    "FATAL: The URLs input file was not found at '{}'",
                    urls_file.display()
                );
                std::process::exit(1);
            }

            let mut builder = Crawler::builder().verbose(verbose);
            if no_prune {
                builder = builder.pruning(None);
            }
            if fit {
                builder = builder.variant(MarkdownVariant::Fit);
            }
            if let Some(ua) = user_agent {
                builder = builder.user_agent(ua);
            }
            if let Some(ms) = delay_ms {
                builder = builder.delay(Duration::from_millis(ms));
            }
            if let Some(limit) = max_page_bytes {
                builder = builder.max_page_bytes(limit);
            }

            run_crawl(builder.build(), &urls_file, &output_dir, format).await;
        }
        Commands::Sitemap {
            sitemap,
            format,
            output,
        } => run_sitemap(&sitemap, format, output.as_deref()),
    }
}

async fn run_crawl(crawler: Crawler, urls_file: &Path, output_dir: &Path, format: OutputFormat) {
    match crawler.crawl_file(urls_file, output_dir).await {
        Ok(summary) => match format {
            OutputFormat::Text => writeln_safe(&format_crawl_summary(&summary, output_dir)),
            OutputFormat::Json => print_json(&summary),
        },
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_sitemap(path: &Path, format: OutputFormat, output: Option<&Path>) {
    if !path.exists() {
        eprintln!(
            "CRITICAL ERROR: Sitemap file not found at '{}'",
            path.display()
        );
        std::process::exit(1);
    }

    tracing::info!("Attempting to extract URLs from sitemap: {}", path.display());
    let sitemap = load_sitemap(path);

    if let Some(output) = output {
        if let Err(e) = std::fs::write(output, format_url_list(&sitemap.urls)) {
            eprintln!("Error: could not write {}: {}", output.display(), e);
            std::process::exit(1);
        }
        tracing::info!("Wrote {} URLs to {}", sitemap.urls.len(), output.display());
    }

    match format {
        OutputFormat::Text => writeln_safe(&format_sitemap_text(&sitemap)),
        OutputFormat::Json => print_json(&sitemap),
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    let json = serde_json::to_string_pretty(value).unwrap_or_else(|e| {
        eprintln!("Error serializing output: {}", e);
        std::process::exit(1);
    });
    writeln_safe(&json);
}

/// One URL per line, newline terminated
fn format_url_list(urls: &[String]) -> String {
    let mut output = String::new();
    for url in urls {
        output.push_str(url);
        output.push('\n');
    }
    output
}

fn format_sitemap_text(sitemap: &Sitemap) -> String {
    if sitemap.urls.is_empty() {
        return "No URLs were extracted. Check sitemap content and parsing logic (e.g., namespaces)."
            .to_string();
    }

    let mut output = format!("Successfully extracted {} URLs:\n", sitemap.urls.len());
    output.push_str(format_url_list(&sitemap.urls).trim_end());
    output
}

fn format_crawl_summary(summary: &CrawlSummary, output_dir: &Path) -> String {
    let mut output = format!(
        "Saved {} of {} pages to {}",
        summary.saved,
        summary.total,
        output_dir.display()
    );
    if summary.failed > 0 {
        output.push_str(&format!("\nfailed: {}", summary.failed));
    }
    if summary.empty > 0 {
        output.push_str(&format!("\nno content: {}", summary.empty));
    }
    if summary.critical > 0 {
        output.push_str(&format!("\ncritical: {}", summary.critical));
    }
    output
}

/// Write to stdout, exit silently on broken pipe
fn writeln_safe(s: &str) {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = writeln!(handle, "{}", s) {
        if e.kind() == io::ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
        eprintln!("Error writing to stdout: {}", e);
        std::process::exit(1);
    }
}
