//! Bill subjects from the statehouse subject search.
//!
//! The search is slow and the server often cuts responses short, so the index
//! is built once per run, before any bill is read, and only consulted after
//! that. Runs that skip it attach no subjects.

use crate::convert::DocumentConverter;
use crate::error::{Error, Result};
use crate::fetch::{Fetcher, Request};
use crate::html::Document;
use crate::index::STATEHOUSE;
use crate::scraper::ScrapeContext;
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::sync::OnceLock;
use tracing::{info, warn};

const SESSION_CODES: &[(&str, &str)] = &[
    ("2013-2014", "120"),
    ("2015-2016", "121"),
    ("2017-2018", "122"),
    ("2019-2020", "123"),
    ("2021-2022", "124"),
    ("2023-2024", "125"),
];

/// Style of the bold markers wrapping bill numbers on a subject page
const BILL_MARKER_STYLE: &str = "font-weight:bold;";

pub fn session_code(session: &str) -> Result<&'static str> {
    SESSION_CODES
        .iter()
        .find(|(s, _)| *s == session)
        .map(|(_, code)| *code)
        .ok_or_else(|| Error::UnknownSession(session.to_string()))
}

fn search_url() -> String {
    format!("{}/subjectsearch.php", STATEHOUSE)
}

/// Read-only mapping from bill id ("H 3001") to subjects
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectIndex {
    subjects: HashMap<String, BTreeSet<String>>,
}

impl SubjectIndex {
    /// An index with no subjects, used when the subject pass is skipped
    pub fn empty() -> Self {
        Self::default()
    }

    /// Run the subject search for a session
    pub fn build<F, C>(ctx: &ScrapeContext<F, C>, session: &str) -> Result<Self>
    where
        F: Fetcher,
        C: DocumentConverter,
    {
        let code = session_code(session)?;
        let url = search_url();
        let form = [
            ("GETINDEX", "Y"),
            ("SESSION", code),
            ("INDEXCODE", "0"),
            ("INDEXTEXT", ""),
            ("AORB", "B"),
            ("PAGETYPE", "0"),
        ];
        let listing = ctx.fetch(Request::post(url.clone(), form))?;

        let mut index = Self::empty();
        for (subject, value) in parse_subject_options(&listing.text()) {
            let subject_url = format!(
                "{}?AORB=B&session={}&indexcode={}",
                url, code, value
            );
            info!("Subject {}: {}", subject, subject_url);

            let page = ctx.fetch(Request::get(subject_url.clone()).allow_partial())?;
            if page.truncated {
                warn!("Subject page {} was cut short, using partial content", subject_url);
            }
            for bill_id in parse_subject_page(&page.text())? {
                index.insert(bill_id, subject.clone());
            }
        }

        info!(
            "Subject index for {} covers {} bills",
            session,
            index.subjects.len()
        );
        Ok(index)
    }

    pub fn insert(&mut self, bill_id: impl Into<String>, subject: impl Into<String>) {
        self.subjects
            .entry(bill_id.into())
            .or_default()
            .insert(subject.into());
    }

    /// Subjects recorded for a bill; empty when the bill is unknown
    pub fn subjects_for(&self, bill_id: &str) -> impl Iterator<Item = &str> {
        self.subjects
            .get(bill_id)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }
}

/// (subject, index code) pairs from the search form, minus the two filler
/// options at the top
pub fn parse_subject_options(html: &str) -> Vec<(String, String)> {
    let doc = Document::parse(html);
    doc.find_all("option")
        .into_iter()
        .skip(2)
        .filter_map(|option| {
            let value = option.attr("value")?;
            let subject = option.text().trim().to_string();
            Some((subject, value.to_string()))
        })
        .collect()
}

fn bill_marker_regex() -> Result<&'static Regex> {
    static MARKER: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();
    MARKER
        .get_or_init(|| Regex::new(r"^([HS]) (\d{4})"))
        .as_ref()
        .map_err(|e| Error::Regex(e.clone()))
}

/// Bill ids marked on a subject results page
pub fn parse_subject_page(html: &str) -> Result<Vec<String>> {
    let marker = bill_marker_regex()?;
    let doc = Document::parse(html);
    Ok(doc
        .find_all("span")
        .into_iter()
        .filter(|span| span.attr("style") == Some(BILL_MARKER_STYLE))
        .filter_map(|span| {
            let text = span.text();
            let caps = marker.captures(text.trim())?;
            Some(normalize_bill_id(&caps[1], &caps[2]))
        })
        .collect())
}

/// "H 0123*" → "H 123"
fn normalize_bill_id(letter: &str, number: &str) -> String {
    let number = number.trim_end_matches('*').trim_start_matches('0');
    let number = if number.is_empty() { "0" } else { number };
    format!("{} {}", letter, number)
}
