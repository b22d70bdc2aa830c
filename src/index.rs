//! Locating bills: the per-chamber introduction index, its day pages and the
//! prefiled-bills page.
//!
//! The statehouse only serves the current session's introduction index, so
//! past sessions are read from a Wayback Machine snapshot taken near the end of
//! that session. Snapshot ids are picked by hand during the session
//! transition: search the chamber index URL on web.archive.org, take the last
//! snapshot of the session's final year that still lists the full session's
//! introductions (usually early November), and record its 14-digit id here.

use crate::error::{Error, Result};
use crate::html::{absolute_url, Document};
use crate::types::Chamber;
use regex::Regex;
use std::sync::OnceLock;

pub const STATEHOUSE: &str = "https://www.scstatehouse.gov";
pub const ARCHIVE_PREFIX: &str = "https://web.archive.org/web";

/// (session, chamber) → Wayback snapshot id of that chamber's index page
const ARCHIVE_SNAPSHOTS: &[(&str, Chamber, &str)] = &[
    ("2017-2018", Chamber::Lower, "20181101144929"),
    ("2017-2018", Chamber::Upper, "20181101144422"),
    ("2019-2020", Chamber::Lower, "20201101155143"),
    ("2019-2020", Chamber::Upper, "20201101152857"),
    ("2021-2022", Chamber::Lower, "20221110101038"),
    ("2021-2022", Chamber::Upper, "20221110101352"),
];

pub fn archive_snapshot(session: &str, chamber: Chamber) -> Option<&'static str> {
    ARCHIVE_SNAPSHOTS
        .iter()
        .find(|(s, c, _)| *s == session && *c == chamber)
        .map(|(_, _, id)| *id)
}

/// URL of the daily introductions index for a chamber. Sessions with a
/// snapshot entry are read through the archive; any other session is taken to
/// be the current one.
pub fn index_url(session: &str, chamber: Chamber) -> String {
    let direct = format!("{}/sessphp/{}intros.php", STATEHOUSE, chamber.letter());
    match archive_snapshot(session, chamber) {
        Some(id) => format!("{}/{}/{}", ARCHIVE_PREFIX, id, direct),
        None => direct,
    }
}

/// URL of the prefiled bills page, keyed by the first year's last two digits
pub fn prefile_url(session: &str) -> String {
    let year = session.get(2..4).unwrap_or_default();
    format!("{}/sessphp/prefil{}.php", STATEHOUSE, year)
}

fn archive_regex() -> Result<&'static Regex> {
    static ARCHIVE: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();
    ARCHIVE
        .get_or_init(|| Regex::new(r"^https?://web\.archive\.org/web/\d+[a-z_]*/(.+)$"))
        .as_ref()
        .map_err(|e| Error::Regex(e.clone()))
}

/// Archived pages rewrite their links through the archive. Only the index
/// itself should be fetched that way, so day links are unwrapped back to the
/// live site.
pub fn unwrap_archive_url(url: &str) -> Result<String> {
    let unwrapped = archive_regex()?
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map_or(url, |m| m.as_str());
    Ok(unwrapped.to_string())
}

/// A bill found on a day page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillLink {
    pub bill_id: String,
    pub url: String,
    pub chamber: Chamber,
}

/// Day links on an introductions index (`div > b > a`)
pub fn parse_index_page(html: &str, page_url: &str) -> Result<Vec<String>> {
    let doc = Document::parse(html);
    let mut days = Vec::new();
    for bold in doc.find_all("b") {
        if bold.parent().map(|p| p.name()) != Some("div") {
            continue;
        }
        for anchor in bold.children_named("a") {
            if let Some(href) = anchor.attr("href") {
                let url = absolute_url(page_url, href)?;
                days.push(unwrap_archive_url(&url)?);
            }
        }
    }
    Ok(days)
}

/// Day links on the prefiled bills page: `<dd>` entries naming the chamber
pub fn parse_prefile_page(html: &str, page_url: &str, chamber: Chamber) -> Result<Vec<String>> {
    let doc = Document::parse(html);
    let mut days = Vec::new();
    for entry in doc.find_all("dd") {
        if !entry
            .own_texts()
            .iter()
            .any(|text| text.contains(chamber.body_name()))
        {
            continue;
        }
        for anchor in entry.children_named("a") {
            if let Some(href) = anchor.attr("href") {
                let url = absolute_url(page_url, href)?;
                days.push(unwrap_archive_url(&url)?);
            }
        }
    }
    Ok(days)
}

/// Bills of `chamber` listed on a day page: the first link of each paragraph,
/// whose text is the bill number ("H. 3001" → "H 3001")
pub fn parse_day_page(html: &str, page_url: &str, chamber: Chamber) -> Result<Vec<BillLink>> {
    let doc = Document::parse(html);
    let mut bills = Vec::new();
    for paragraph in doc.find_all("p") {
        let Some(anchor) = paragraph.children_named("a").next() else {
            continue;
        };
        let Some(href) = anchor.attr("href") else {
            continue;
        };
        let bill_id = anchor.text().replace('.', "").trim().to_string();
        let belongs = bill_id
            .chars()
            .next()
            .map(|c| c.to_ascii_lowercase() == chamber.letter())
            .unwrap_or(false);
        if !belongs {
            continue;
        }
        bills.push(BillLink {
            bill_id,
            url: absolute_url(page_url, href)?,
            chamber,
        });
    }
    Ok(bills)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_past_session_uses_archive() {
        let url = index_url("2019-2020", Chamber::Upper);
        assert_eq!(
            url,
            "https://web.archive.org/web/20201101152857/https://www.scstatehouse.gov/sessphp/sintros.php"
        );
    }

    #[test]
    fn test_current_session_is_direct() {
        assert_eq!(
            index_url("2023-2024", Chamber::Upper),
            "https://www.scstatehouse.gov/sessphp/sintros.php"
        );
        assert_eq!(
            index_url("2023-2024", Chamber::Lower),
            "https://www.scstatehouse.gov/sessphp/hintros.php"
        );
    }

    #[test]
    fn test_prefile_url() {
        assert_eq!(
            prefile_url("2019-2020"),
            "https://www.scstatehouse.gov/sessphp/prefil19.php"
        );
    }

    #[test]
    fn test_unwrap_archive_url() {
        assert_eq!(
            unwrap_archive_url(
                "https://web.archive.org/web/20201101152857/https://www.scstatehouse.gov/sessphp/day1.php"
            )
            .unwrap(),
            "https://www.scstatehouse.gov/sessphp/day1.php"
        );
        assert_eq!(
            unwrap_archive_url("https://www.scstatehouse.gov/sessphp/day1.php").unwrap(),
            "https://www.scstatehouse.gov/sessphp/day1.php"
        );
    }

    #[test]
    fn test_archive_pattern_is_compiled_once() {
        let first = archive_regex().unwrap();
        let second = archive_regex().unwrap();
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn test_archived_index_links_are_unwrapped() {
        let base = index_url("2019-2020", Chamber::Lower);
        let html = r#"<div><b><a href="/web/20201101155143/https://www.scstatehouse.gov/sessphp/hintros_011420.php">January 14</a></b></div>
            <b><a href="ignored.php">not in a div</a></b>"#;
        let days = parse_index_page(html, &base).unwrap();
        assert_eq!(
            days,
            vec!["https://www.scstatehouse.gov/sessphp/hintros_011420.php"]
        );
    }

    #[test]
    fn test_day_page_filters_chamber() {
        let html = r#"
            <p><a href="/sess123_2019-2020/bills/3001.htm">H. 3001</a> (Word version) Rep. Smith</p>
            <p><a href="/sess123_2019-2020/bills/1.htm">S. 1</a></p>
            <p>No link here</p>"#;
        let bills =
            parse_day_page(html, "https://www.scstatehouse.gov/sessphp/day.php", Chamber::Lower).unwrap();
        assert_eq!(bills.len(), 1);
        assert_eq!(bills[0].bill_id, "H 3001");
        assert_eq!(
            bills[0].url,
            "https://www.scstatehouse.gov/sess123_2019-2020/bills/3001.htm"
        );
    }

    #[test]
    fn test_prefile_page_by_chamber() {
        let html = r#"<dl>
            <dt>December 10, 2019
            <dd>House <a href="prefil_h_1210.php">Bills</a>
            <dd>Senate <a href="prefil_s_1210.php">Bills</a>
            </dl>"#;
        let days = parse_prefile_page(
            html,
            "https://www.scstatehouse.gov/sessphp/prefil19.php",
            Chamber::Upper,
        )
        .unwrap();
        assert_eq!(days, vec!["https://www.scstatehouse.gov/sessphp/prefil_s_1210.php"]);
    }
}
