use crate::error::{Error, Result};
use crate::fetch::HttpVersion;
use crate::types::Chamber;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for one scrape run
#[derive(Debug, Clone)]
pub struct Config {
    pub session: String,
    pub chambers: Vec<Chamber>,
    pub scrape_subjects: bool,
    pub http_version: HttpVersion,
    pub retry_attempts: u32,
    pub retry_wait: Duration,
    pub timeout: Duration,
    pub user_agent: String,
    pub pdftotext: PathBuf,
    pub output_dir: Option<PathBuf>,
}

impl Config {
    /// Create a default configuration for a session
    pub fn new(session: impl Into<String>) -> Self {
        Self {
            session: session.into(),
            chambers: vec![Chamber::Upper, Chamber::Lower],
            scrape_subjects: false,
            http_version: HttpVersion::Http10,
            retry_attempts: 5,
            retry_wait: Duration::from_secs(10),
            timeout: Duration::from_secs(60),
            user_agent: format!("scbills/{}", env!("CARGO_PKG_VERSION")),
            pdftotext: PathBuf::from("pdftotext"),
            output_dir: None,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !is_session_name(&self.session) {
            return Err(Error::Config(format!(
                "Session must look like 2019-2020, got '{}'",
                self.session
            )));
        }

        if self.chambers.is_empty() {
            return Err(Error::Config("At least one chamber is required".to_string()));
        }

        if let Some(dir) = &self.output_dir {
            if dir.exists() && !dir.is_dir() {
                return Err(Error::Config(format!(
                    "Output path is not a directory: {}",
                    dir.display()
                )));
            }
        }

        Ok(())
    }
}

/// Sessions are two four-digit years joined by a dash
fn is_session_name(session: &str) -> bool {
    match session.split_once('-') {
        Some((start, end)) => {
            start.len() == 4
                && end.len() == 4
                && start.chars().all(|c| c.is_ascii_digit())
                && end.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

/// Builder for creating configurations
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with default settings
    pub fn new(session: impl Into<String>) -> Self {
        Self {
            config: Config::new(session),
        }
    }

    /// Restrict the run to a single chamber
    pub fn chamber(mut self, chamber: Chamber) -> Self {
        self.config.chambers = vec![chamber];
        self
    }

    /// Set chamber from string ("upper", "lower" or "both")
    pub fn chamber_str(mut self, chamber: &str) -> Result<Self> {
        self.config.chambers = match chamber.trim().to_lowercase().as_str() {
            "both" | "" => vec![Chamber::Upper, Chamber::Lower],
            other => vec![Chamber::parse(other).ok_or_else(|| {
                Error::Config(format!(
                    "Invalid chamber '{}'. Allowed values are: upper, lower, both",
                    other
                ))
            })?],
        };
        Ok(self)
    }

    /// Enable the subject search pass
    pub fn scrape_subjects(mut self, enabled: bool) -> Self {
        self.config.scrape_subjects = enabled;
        self
    }

    /// Set the HTTP version used for every request
    pub fn http_version(mut self, version: HttpVersion) -> Self {
        self.config.http_version = version;
        self
    }

    /// Set the number of attempts per request
    pub fn retry_attempts(mut self, attempts: u32) -> Self {
        self.config.retry_attempts = attempts;
        self
    }

    /// Set the wait before the first retry
    pub fn retry_wait(mut self, wait: Duration) -> Self {
        self.config.retry_wait = wait;
        self
    }

    /// Set the per-request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the User-Agent header
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Set the pdftotext binary used for roll-call documents
    pub fn pdftotext(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdftotext = path.into();
        self
    }

    /// Write records into a directory instead of stdout
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = Some(dir.into());
        self
    }

    /// Build the final configuration
    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConfigBuilder::new("2019-2020").build().unwrap();
        assert_eq!(config.chambers, vec![Chamber::Upper, Chamber::Lower]);
        assert_eq!(config.retry_attempts, 5);
        assert_eq!(config.http_version, HttpVersion::Http10);
        assert!(!config.scrape_subjects);
    }

    #[test]
    fn test_rejects_malformed_session() {
        assert!(ConfigBuilder::new("2019").build().is_err());
        assert!(ConfigBuilder::new("20a9-2020").build().is_err());
    }

    #[test]
    fn test_chamber_str() {
        let config = ConfigBuilder::new("2023-2024")
            .chamber_str("lower")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(config.chambers, vec![Chamber::Lower]);

        assert!(ConfigBuilder::new("2023-2024").chamber_str("joint").is_err());
    }

    #[test]
    fn test_client_settings() {
        let config = ConfigBuilder::new("2019-2020").build().unwrap();
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert!(config.user_agent.starts_with("scbills/"));

        let config = ConfigBuilder::new("2019-2020")
            .timeout(Duration::from_secs(5))
            .user_agent("statehouse-mirror/2.0")
            .build()
            .unwrap();
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.user_agent, "statehouse-mirror/2.0");
    }
}
