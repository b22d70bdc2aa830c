//! Scrape orchestration.
//!
//! [`BillScraper`] walks each chamber's introduction index and prefiled-bills
//! page, then every day page they link, then every bill on those day pages. It
//! is a lazy iterator: nothing is fetched until the next record is asked for,
//! and records come out in discovery order. A bill's votes are yielded before
//! the bill itself.

use crate::bill::{scrape_bill, BillOutcome};
use crate::config::Config;
use crate::convert::{fetch_document_text, DocumentConverter};
use crate::error::Result;
use crate::fetch::{Fetcher, HttpVersion, Page, Request};
use crate::index::{self, BillLink};
use crate::subjects::SubjectIndex;
use crate::types::{Chamber, ScrapedRecord};
use std::collections::{HashSet, VecDeque};
use tracing::{debug, info, warn};

/// The collaborators every step of a scrape fetches through
pub struct ScrapeContext<F, C> {
    fetcher: F,
    converter: C,
    http_version: HttpVersion,
}

impl<F, C> ScrapeContext<F, C>
where
    F: Fetcher,
    C: DocumentConverter,
{
    pub fn new(fetcher: F, converter: C, http_version: HttpVersion) -> Self {
        Self {
            fetcher,
            converter,
            http_version,
        }
    }

    /// Issue a request with the run's protocol version
    pub fn fetch(&self, request: Request) -> Result<Page> {
        let request = request.http_version(self.http_version);
        self.fetcher.fetch(&request)
    }

    pub fn get(&self, url: &str) -> Result<Page> {
        self.fetch(Request::get(url))
    }

    /// Download a document and return its text
    pub fn document_text(&self, url: &str) -> Result<String> {
        let request = Request::get(url).http_version(self.http_version);
        fetch_document_text(&self.fetcher, &self.converter, &request)
    }
}

/// One unit of pending work
#[derive(Debug, Clone, PartialEq, Eq)]
enum Work {
    Subjects,
    Index(Chamber),
    Prefile(Chamber),
    Day { chamber: Chamber, url: String },
    Bill(BillLink),
}

/// Lazy, forward-only sequence of scraped records for one session
pub struct BillScraper<F, C> {
    config: Config,
    ctx: ScrapeContext<F, C>,
    subjects: SubjectIndex,
    seen_rollcalls: HashSet<String>,
    queue: VecDeque<Work>,
    pending: VecDeque<ScrapedRecord>,
}

impl<F, C> BillScraper<F, C>
where
    F: Fetcher,
    C: DocumentConverter,
{
    pub fn new(config: Config, fetcher: F, converter: C) -> Self {
        let ctx = ScrapeContext::new(fetcher, converter, config.http_version);

        let mut queue = VecDeque::new();
        if config.scrape_subjects {
            queue.push_back(Work::Subjects);
        }
        for &chamber in &config.chambers {
            queue.push_back(Work::Index(chamber));
            queue.push_back(Work::Prefile(chamber));
        }

        Self {
            config,
            ctx,
            subjects: SubjectIndex::empty(),
            seen_rollcalls: HashSet::new(),
            queue,
            pending: VecDeque::new(),
        }
    }

    /// Queue work ahead of everything already queued, keeping its order
    fn push_front_all(&mut self, work: Vec<Work>) {
        for item in work.into_iter().rev() {
            self.queue.push_front(item);
        }
    }

    fn run(&mut self, work: Work) -> Result<()> {
        match work {
            Work::Subjects => {
                self.subjects = SubjectIndex::build(&self.ctx, &self.config.session)?;
            }
            Work::Index(chamber) => {
                let url = index::index_url(&self.config.session, chamber);
                info!("Index for {} {}: {}", self.config.session, chamber, url);
                let page = self.ctx.get(&url)?;
                let days = index::parse_index_page(&page.text(), &url)?;
                self.queue_days(chamber, days);
            }
            Work::Prefile(chamber) => {
                let url = index::prefile_url(&self.config.session);
                info!("Prefiled bills for {} {}: {}", self.config.session, chamber, url);
                let page = self.ctx.get(&url)?;
                let days = index::parse_prefile_page(&page.text(), &url, chamber)?;
                self.queue_days(chamber, days);
            }
            Work::Day { chamber, url } => {
                let page = match self.ctx.get(&url) {
                    Ok(page) => page,
                    Err(e) => {
                        warn!("Skipping day page {}: {}", url, e);
                        return Ok(());
                    }
                };
                let bills = index::parse_day_page(&page.text(), &url, chamber)?;
                debug!("{} bills on {}", bills.len(), url);
                self.push_front_all(bills.into_iter().map(Work::Bill).collect());
            }
            Work::Bill(link) => {
                info!("Bill {} at {}", link.bill_id, link.url);
                let outcome = scrape_bill(
                    &self.ctx,
                    &link,
                    &self.config.session,
                    &self.subjects,
                    &self.seen_rollcalls,
                )?;
                if let Some(BillOutcome { bill, votes }) = outcome {
                    for vote in votes {
                        if let Some(key) = &vote.dedupe_key {
                            self.seen_rollcalls.insert(key.clone());
                        }
                        self.pending.push_back(ScrapedRecord::Vote(vote));
                    }
                    self.pending.push_back(ScrapedRecord::Bill(bill));
                }
            }
        }
        Ok(())
    }

    fn queue_days(&mut self, chamber: Chamber, days: Vec<String>) {
        debug!("{} day pages for {}", days.len(), chamber);
        self.push_front_all(
            days.into_iter()
                .map(|url| Work::Day { chamber, url })
                .collect(),
        );
    }
}

impl<F, C> Iterator for BillScraper<F, C>
where
    F: Fetcher,
    C: DocumentConverter,
{
    type Item = Result<ScrapedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.pending.pop_front() {
                return Some(Ok(record));
            }
            let work = self.queue.pop_front()?;
            let is_subjects = work == Work::Subjects;
            if let Err(e) = self.run(work) {
                // Bills cannot be read without the subject index they expect
                if is_subjects {
                    self.queue.clear();
                }
                return Some(Err(e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::path::Path;

    #[derive(Default)]
    struct Pages {
        pages: HashMap<String, String>,
        requests: RefCell<Vec<Request>>,
    }

    impl Fetcher for Pages {
        fn fetch(&self, request: &Request) -> Result<Page> {
            self.requests.borrow_mut().push(request.clone());
            match self.pages.get(&request.url) {
                Some(body) => Ok(Page {
                    url: request.url.clone(),
                    status: 200,
                    body: body.clone().into_bytes(),
                    truncated: false,
                }),
                None => Err(Error::Status {
                    url: request.url.clone(),
                    status: 404,
                }),
            }
        }
    }

    struct NoDocuments;

    impl DocumentConverter for NoDocuments {
        fn convert(&self, _path: &Path) -> Result<String> {
            Ok(String::new())
        }
    }

    #[test]
    fn test_context_applies_http_version() {
        let fetcher = Pages::default();
        let ctx = ScrapeContext::new(&fetcher, NoDocuments, HttpVersion::Http11);
        let _ = ctx.get("https://www.scstatehouse.gov/missing");
        let requests = fetcher.requests.borrow();
        assert_eq!(requests[0].http_version, HttpVersion::Http11);
    }

    #[test]
    fn test_initial_work_order() {
        let mut config = Config::new("2023-2024");
        config.scrape_subjects = true;
        let scraper = BillScraper::new(config, Pages::default(), NoDocuments);
        assert_eq!(
            scraper.queue.iter().cloned().collect::<Vec<_>>(),
            vec![
                Work::Subjects,
                Work::Index(Chamber::Upper),
                Work::Prefile(Chamber::Upper),
                Work::Index(Chamber::Lower),
                Work::Prefile(Chamber::Lower),
            ]
        );
    }

    #[test]
    fn test_unknown_subject_session_ends_run() {
        let mut config = Config::new("1999-2000");
        config.scrape_subjects = true;
        let mut scraper = BillScraper::new(config, Pages::default(), NoDocuments);

        assert!(matches!(scraper.next(), Some(Err(Error::UnknownSession(_)))));
        assert!(scraper.next().is_none());
    }

    #[test]
    fn test_missing_index_is_yielded_and_run_continues() {
        let mut config = Config::new("2023-2024");
        config.chambers = vec![Chamber::Upper];
        let scraper = BillScraper::new(config, Pages::default(), NoDocuments);

        let results: Vec<_> = scraper.collect();
        // Index and prefile page both fail
        assert_eq!(results.len(), 2);
        assert!(results
            .iter()
            .all(|r| matches!(r, Err(Error::Status { status: 404, .. }))));
    }
}
