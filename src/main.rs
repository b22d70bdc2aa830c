use clap::{Parser, Subcommand};
use scbills::prelude::*;
use scbills::{classify_action, index};
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Scrape South Carolina bills and votes into Open States style JSON
#[derive(Parser, Debug)]
#[command(name = "scbills")]
#[command(about = "Scrape South Carolina General Assembly bills and votes")]
#[command(version)]
struct Args {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape a session and write bills and votes
    Scrape(ScrapeArgs),

    /// Print the introduction index URL for a session and chamber
    IndexUrl {
        session: String,

        /// upper or lower
        chamber: String,
    },

    /// Print the action tags for an action description
    Classify {
        action: String,
    },
}

#[derive(clap::Args, Debug)]
struct ScrapeArgs {
    /// Session to scrape (e.g. 2019-2020)
    session: String,

    /// Chamber to scrape: upper, lower or both
    #[arg(long, default_value = "both")]
    chamber: String,

    /// Build the subject index before reading bills (slow)
    #[arg(long)]
    subjects: bool,

    /// Write one JSON file per record under this directory instead of
    /// JSON lines on stdout
    #[arg(long, env = "SCBILLS_OUTPUT_DIR")]
    output: Option<PathBuf>,

    /// Path to the pdftotext binary
    #[arg(long, env = "SCBILLS_PDFTOTEXT", default_value = "pdftotext")]
    pdftotext: PathBuf,

    /// Use HTTP/1.1 instead of HTTP/1.0
    #[arg(long)]
    http11: bool,

    /// Attempts per request before giving up
    #[arg(long, default_value_t = 5)]
    retries: u32,

    /// Seconds to wait before the first retry
    #[arg(long, default_value_t = 10)]
    retry_wait: u64,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 60)]
    timeout: u64,

    /// User-Agent header sent with every request
    #[arg(long, env = "SCBILLS_USER_AGENT")]
    user_agent: Option<String>,
}

impl ScrapeArgs {
    fn config(self) -> anyhow::Result<Config> {
        let mut builder = ConfigBuilder::new(self.session)
            .chamber_str(&self.chamber)?
            .scrape_subjects(self.subjects)
            .pdftotext(self.pdftotext)
            .retry_attempts(self.retries)
            .retry_wait(Duration::from_secs(self.retry_wait))
            .timeout(Duration::from_secs(self.timeout));
        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }
        if self.http11 {
            builder = builder.http_version(HttpVersion::Http11);
        }
        if let Some(dir) = self.output {
            builder = builder.output_dir(dir);
        }
        Ok(builder.build()?)
    }
}

fn init_tracing(level: &str) {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("scbills={},warn", level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    match args.command {
        Command::Scrape(scrape) => run_scrape(scrape.config()?),
        Command::IndexUrl { session, chamber } => {
            let chamber = Chamber::parse(&chamber)
                .ok_or_else(|| anyhow::anyhow!("Unknown chamber '{}'", chamber))?;
            println!("{}", index::index_url(&session, chamber));
            Ok(())
        }
        Command::Classify { action } => {
            let tags = classify_action(&action);
            if tags.is_empty() {
                println!("(unclassified)");
            }
            for tag in tags {
                println!("{}", tag);
            }
            Ok(())
        }
    }
}

fn run_scrape(config: Config) -> anyhow::Result<()> {
    let fetcher = HttpFetcher::new(&config)?;
    let converter = PdfToText::new(config.pdftotext.clone());
    let mut sink: Box<dyn RecordSink> = match &config.output_dir {
        Some(dir) => Box::new(DirectorySink::new(dir)),
        None => Box::new(JsonLinesSink::new(io::stdout().lock())),
    };

    info!(
        "Scraping {} ({})",
        config.session,
        config
            .chambers
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let mut bills = 0usize;
    let mut votes = 0usize;
    let mut errors = 0usize;
    for result in BillScraper::new(config, fetcher, converter) {
        match result {
            Ok(record) => {
                match &record {
                    ScrapedRecord::Bill(_) => bills += 1,
                    ScrapedRecord::Vote(_) => votes += 1,
                }
                sink.emit(&record)?;
            }
            Err(e) => {
                error!("{}", e);
                errors += 1;
            }
        }
    }

    info!("Done: {} bills, {} votes, {} errors", bills, votes, errors);
    if errors > 0 {
        anyhow::bail!("{} records could not be scraped", errors);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scrape_args(argv: &[&str]) -> ScrapeArgs {
        match Args::try_parse_from(argv).unwrap().command {
            Command::Scrape(scrape) => scrape,
            other => panic!("expected scrape, got {:?}", other),
        }
    }

    #[test]
    fn test_client_flags_reach_config() {
        let config = scrape_args(&[
            "scbills",
            "scrape",
            "2019-2020",
            "--timeout",
            "15",
            "--user-agent",
            "statehouse-mirror/2.0",
            "--http11",
        ])
        .config()
        .unwrap();
        assert_eq!(config.timeout, Duration::from_secs(15));
        assert_eq!(config.user_agent, "statehouse-mirror/2.0");
        assert_eq!(config.http_version, HttpVersion::Http11);
    }

    #[test]
    fn test_scrape_defaults() {
        let config = scrape_args(&["scbills", "scrape", "2019-2020", "--chamber", "upper"])
            .config()
            .unwrap();
        assert_eq!(config.chambers, vec![Chamber::Upper]);
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.retry_attempts, 5);
    }
}
