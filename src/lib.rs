//! Scraper for South Carolina General Assembly bills and roll-call votes.
//!
//! The library walks the statehouse introduction indexes for a session, reads
//! each bill's detail page, versions and vote history, and produces Open
//! States style bill and vote event records as a lazy sequence.

pub mod actions;
pub mod bill;
pub mod config;
pub mod convert;
pub mod error;
pub mod fetch;
pub mod html;
pub mod index;
pub mod rollcall;
pub mod scraper;
pub mod sink;
pub mod subjects;
pub mod types;
pub mod votes;

pub use actions::{classify_action, ActionTag};
pub use config::{Config, ConfigBuilder};
pub use convert::{DocumentConverter, PdfToText};
pub use error::{Error, Result};
pub use fetch::{Fetcher, HttpFetcher, HttpVersion, Page, Request};
pub use scraper::{BillScraper, ScrapeContext};
pub use sink::{DirectorySink, JsonLinesSink, RecordSink};
pub use subjects::SubjectIndex;
pub use types::{Bill, Chamber, ScrapedRecord, VoteEvent, VoteEventResult};

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::config::{Config, ConfigBuilder};
    pub use crate::convert::{DocumentConverter, PdfToText};
    pub use crate::error::{Error, Result};
    pub use crate::fetch::{Fetcher, HttpFetcher, HttpVersion, Page, Request};
    pub use crate::scraper::BillScraper;
    pub use crate::sink::{DirectorySink, JsonLinesSink, RecordSink};
    pub use crate::types::{Bill, Chamber, ScrapedRecord, VoteEvent};
}
