use crate::actions::classify_action;
use crate::convert::DocumentConverter;
use crate::error::{Error, Result};
use crate::fetch::Fetcher;
use crate::html::{absolute_url, Document, ElementRef};
use crate::index::BillLink;
use crate::scraper::ScrapeContext;
use crate::subjects::SubjectIndex;
use crate::types::{
    Action, ActionChamber, Bill, BillClassification, Chamber, EntityType, Sponsorship, VoteEvent,
};
use crate::votes::scrape_vote_history;
use chrono::NaiveDate;
use std::collections::HashSet;
use tracing::warn;

const INVALID_BILL_MARKER: &str = "INVALID BILL NUMBER";
/// Inline style of the block holding the bill type, summaries and actions
const HEADER_STYLE: &str = "margin:0 0 40px 0;";
const FULL_TEXT_LINK: &str = "View full text";
const VOTE_HISTORY_LINK: &str = "View Vote History";
const ACTION_DATE_FORMAT: &str = "%m/%d/%y";
const JOURNAL_CITATIONS: &[&str] = &["(House Journal", "(Senate Journal"];

const HTML_MEDIA_TYPE: &str = "text/html";
const DOCX_MEDIA_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// What the detail page yields before versions and votes are followed
#[derive(Debug, Clone, PartialEq)]
pub struct BillPage {
    pub bill: Bill,
    pub full_text_url: String,
    pub vote_history_url: Option<String>,
}

/// A finished bill and the votes read for it
#[derive(Debug, Clone, PartialEq)]
pub struct BillOutcome {
    pub bill: Bill,
    pub votes: Vec<VoteEvent>,
}

/// Most specific label first: every resolution label contains "Resolution"
pub fn classify_bill_type(label: &str) -> Result<BillClassification> {
    if label.contains("General Bill") {
        Ok(BillClassification::Bill)
    } else if label.contains("Concurrent Resolution") {
        Ok(BillClassification::ConcurrentResolution)
    } else if label.contains("Joint Resolution") {
        Ok(BillClassification::JointResolution)
    } else if label.contains("Resolution") {
        Ok(BillClassification::Resolution)
    } else {
        Err(Error::UnknownBillType(label.trim().to_string()))
    }
}

/// Chamber named by a `chamber=` query parameter on a sponsor link
fn sponsor_chamber(href: &str) -> Option<Chamber> {
    if href.contains("chamber=S") {
        Some(Chamber::Upper)
    } else if href.contains("chamber=H") {
        Some(Chamber::Lower)
    } else {
        None
    }
}

/// Remove a trailing "(House Journal-page 12)" style citation
fn strip_journal_citation(action: &str) -> &str {
    let mut text = action;
    for citation in JOURNAL_CITATIONS {
        if let Some(i) = text.find(citation) {
            text = &text[..i];
        }
    }
    text.trim()
}

fn link_with_text<'a>(doc: &'a Document, label: &str) -> Option<ElementRef<'a>> {
    doc.find_all("a")
        .into_iter()
        .find(|a| a.own_texts().iter().any(|text| text.trim() == label))
}

/// Parse a bill detail page. Returns `None` when the statehouse reports the
/// bill number as invalid.
pub fn parse_bill_page(
    html: &str,
    url: &str,
    session: &str,
    chamber: Chamber,
    bill_id: &str,
    subjects: &SubjectIndex,
) -> Result<Option<BillPage>> {
    if html.contains(INVALID_BILL_MARKER) {
        warn!("Invalid bill {}", url);
        return Ok(None);
    }

    let doc = Document::parse(html);
    let header = doc
        .find_all("div")
        .into_iter()
        .find(|div| div.attr("style") == Some(HEADER_STYLE))
        .ok_or_else(|| Error::markup(url, "bill header block not found"))?;

    let label = header
        .children_named("span")
        .flat_map(|span| span.own_texts())
        .next()
        .ok_or_else(|| Error::markup(url, "bill type label not found"))?;
    let classification = classify_bill_type(label)?;

    // The short summary becomes the title, the long one the abstract
    let fragments: Vec<&str> = header
        .own_texts()
        .into_iter()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .collect();
    let [summary, description] = match fragments.as_slice() {
        [.., summary, description] => [*summary, *description],
        _ => return Err(Error::markup(url, "bill summary and abstract not found")),
    };

    let mut bill = Bill::new(bill_id, session, chamber, summary, classification);
    bill.add_abstract(description, "description");

    for subject in subjects.subjects_for(bill_id) {
        bill.add_subject(subject);
    }

    for link in doc.find_all("a") {
        let Some(href) = link.attr("href") else {
            continue;
        };
        if href.contains("member.php") {
            let name = link.text().trim().to_string();
            bill.add_sponsorship(Sponsorship::primary(
                name,
                EntityType::Person,
                sponsor_chamber(href),
            ));
        }
    }
    for link in doc.find_all("a") {
        let Some(href) = link.attr("href") else {
            continue;
        };
        if href.contains("committee.php") {
            let name = link.text().replace('\u{a0}', " ").trim().to_string();
            bill.add_sponsorship(Sponsorship::primary(
                name,
                EntityType::Organization,
                sponsor_chamber(href),
            ));
        }
    }

    let full_text_url = link_with_text(&doc, FULL_TEXT_LINK)
        .and_then(|a| a.attr("href"))
        .ok_or_else(|| Error::markup(url, "full text link not found"))?;
    let full_text_url = absolute_url(url, full_text_url)?;

    for table in header.children_named("table") {
        for row in table.rows() {
            if let Some(action) = parse_action_row(row, url)? {
                bill.add_action(action);
            }
        }
    }

    let vote_history_url = match link_with_text(&doc, VOTE_HISTORY_LINK).and_then(|a| a.attr("href")) {
        Some(href) => Some(absolute_url(url, href)?),
        None => None,
    };

    bill.add_source(url);

    Ok(Some(BillPage {
        bill,
        full_text_url,
        vote_history_url,
    }))
}

/// One row of the action log: date, chamber, description. Heading rows
/// without data cells are passed over.
fn parse_action_row(row: ElementRef<'_>, url: &str) -> Result<Option<Action>> {
    let cells: Vec<ElementRef<'_>> = row.children_named("td").collect();
    if cells.is_empty() {
        return Ok(None);
    }
    let [date_cell, chamber_cell, action_cell] = cells.as_slice() else {
        return Err(Error::markup(
            url,
            format!("action row has {} cells, expected 3", cells.len()),
        ));
    };

    let date = NaiveDate::parse_from_str(date_cell.text().trim(), ACTION_DATE_FORMAT)?;
    let chamber = match chamber_cell.text().trim() {
        "Senate" => ActionChamber::Upper,
        "House" => ActionChamber::Lower,
        "" => ActionChamber::Legislature,
        other => {
            return Err(Error::markup(
                url,
                format!("unknown action chamber '{}'", other),
            ))
        }
    };

    let text = action_cell.text();
    let description = strip_journal_citation(&text).to_string();
    let classification = classify_action(&description).to_vec();

    Ok(Some(Action {
        description,
        date,
        chamber,
        classification,
    }))
}

/// Version documents linked from a bill's versions page
pub fn parse_versions_page(html: &str, url: &str) -> Result<Vec<(String, String)>> {
    let doc = Document::parse(html);
    let mut versions = Vec::new();
    for link in doc.find_all("a") {
        let Some(href) = link.attr("href") else {
            continue;
        };
        if href.contains("/prever/") {
            versions.push((link.text().trim().to_string(), absolute_url(url, href)?));
        }
    }
    Ok(versions)
}

/// Prefiled bills link straight to the filed document instead of a versions page
fn is_prefiled_document(full_text_url: &str) -> bool {
    full_text_url.to_lowercase().contains("/bills/")
}

/// Read a bill's detail page, its versions and its vote history
pub fn scrape_bill<F, C>(
    ctx: &ScrapeContext<F, C>,
    link: &BillLink,
    session: &str,
    subjects: &SubjectIndex,
    seen_rollcalls: &HashSet<String>,
) -> Result<Option<BillOutcome>>
where
    F: Fetcher,
    C: DocumentConverter,
{
    let page = ctx.get(&link.url)?;
    let Some(BillPage {
        mut bill,
        full_text_url,
        vote_history_url,
    }) = parse_bill_page(
        &page.text(),
        &link.url,
        session,
        link.chamber,
        &link.bill_id,
        subjects,
    )?
    else {
        return Ok(None);
    };

    if is_prefiled_document(&full_text_url) {
        bill.add_version_link("Filed", full_text_url.clone(), HTML_MEDIA_TYPE);
        bill.add_version_link("Filed", full_text_url.replace(".htm", ".docx"), DOCX_MEDIA_TYPE);
    } else {
        let versions_page = ctx.get(&full_text_url)?;
        for (note, url) in parse_versions_page(&versions_page.text(), &full_text_url)? {
            bill.add_version_link(note, url, HTML_MEDIA_TYPE);
        }
    }

    let votes = match vote_history_url {
        Some(url) => scrape_vote_history(ctx, &bill, &url, seen_rollcalls)?,
        None => Vec::new(),
    };
    bill.vote_events = votes
        .iter()
        .filter_map(|vote| vote.dedupe_key.clone())
        .collect();

    Ok(Some(BillOutcome { bill, votes }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ActionTag;

    const URL: &str = "https://www.scstatehouse.gov/sess123_2019-2020/bills/3001.htm";

    fn detail_page(label: &str, actions: &str) -> String {
        format!(
            r#"<html><body>
<div style="margin:0 0 40px 0;">
<span style="font-weight:bold;">{label}</span><br>
<a href="/member.php?code=123&amp;chamber=H">Rep. Smith</a>,
<a href="/member.php?code=456">Jones</a><br>
<a href="/committee.php?code=7&chamber=S">Senate&nbsp;Judiciary</a><br>
Summary: Farm Tax
<br>
A BILL TO AMEND SECTION 12-6-1140 RELATING TO AGRICULTURE.
<table>
{actions}
</table>
<a href="/sess123_2019-2020/prever/3001_20200115.htm">View full text</a>
<a href="/votehistory.php?KEY=3001">View Vote History</a>
</div>
</body></html>"#
        )
    }

    fn parse(html: &str) -> Result<Option<BillPage>> {
        parse_bill_page(html, URL, "2019-2020", Chamber::Lower, "H 3001", &SubjectIndex::empty())
    }

    #[test]
    fn test_bill_type_most_specific_first() {
        assert_eq!(
            classify_bill_type("Joint Resolution").unwrap(),
            BillClassification::JointResolution
        );
        assert_eq!(
            classify_bill_type("Concurrent Resolution").unwrap(),
            BillClassification::ConcurrentResolution
        );
        assert_eq!(
            classify_bill_type("Resolution").unwrap(),
            BillClassification::Resolution
        );
        assert_eq!(
            classify_bill_type("General Bill").unwrap(),
            BillClassification::Bill
        );
        assert!(matches!(
            classify_bill_type("Memorial"),
            Err(Error::UnknownBillType(_))
        ));
    }

    #[test]
    fn test_parses_detail_page() {
        let html = detail_page(
            "General Bill",
            "<tr><td>01/15/20</td><td>Senate</td><td>Introduced and read first time (Senate Journal-page 12)</td></tr>\
             <tr><td>01/16/20</td><td></td><td>Scrivener's error corrected</td></tr>",
        );
        let page = parse(&html).unwrap().unwrap();
        let bill = &page.bill;

        assert_eq!(bill.classification, BillClassification::Bill);
        assert_eq!(bill.title, "Summary: Farm Tax");
        assert_eq!(
            bill.abstracts[0].text,
            "A BILL TO AMEND SECTION 12-6-1140 RELATING TO AGRICULTURE."
        );
        assert_eq!(bill.abstracts[0].note, "description");

        assert_eq!(bill.sponsorships.len(), 3);
        assert_eq!(bill.sponsorships[0].name, "Rep. Smith");
        assert_eq!(bill.sponsorships[0].chamber, Some(Chamber::Lower));
        assert_eq!(bill.sponsorships[1].chamber, None);
        assert_eq!(bill.sponsorships[2].name, "Senate Judiciary");
        assert_eq!(bill.sponsorships[2].entity_type, EntityType::Organization);
        assert_eq!(bill.sponsorships[2].chamber, Some(Chamber::Upper));

        assert_eq!(bill.actions.len(), 2);
        let first = &bill.actions[0];
        assert_eq!(first.description, "Introduced and read first time");
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2020, 1, 15).unwrap());
        assert_eq!(first.chamber, ActionChamber::Upper);
        assert_eq!(
            first.classification,
            vec![ActionTag::Introduction, ActionTag::Reading1]
        );
        assert_eq!(bill.actions[1].chamber, ActionChamber::Legislature);
        assert!(bill.actions[1].classification.is_empty());

        assert_eq!(
            page.full_text_url,
            "https://www.scstatehouse.gov/sess123_2019-2020/prever/3001_20200115.htm"
        );
        assert_eq!(
            page.vote_history_url.as_deref(),
            Some("https://www.scstatehouse.gov/votehistory.php?KEY=3001")
        );
        assert_eq!(bill.sources[0].url, URL);
    }

    #[test]
    fn test_invalid_bill_number() {
        let html = "<html><body><b>INVALID BILL NUMBER</b></body></html>";
        assert!(parse(html).unwrap().is_none());
    }

    #[test]
    fn test_unknown_bill_type_is_fatal() {
        let html = detail_page("Memorial", "");
        assert!(matches!(parse(&html), Err(Error::UnknownBillType(label)) if label == "Memorial"));
    }

    #[test]
    fn test_bill_type_label_after_anchor() {
        let html = detail_page(r#"<a name="top"></a>Joint Resolution"#, "");
        let page = parse(&html).unwrap().unwrap();
        assert_eq!(page.bill.classification, BillClassification::JointResolution);
    }

    #[test]
    fn test_subjects_attached() {
        let mut subjects = SubjectIndex::empty();
        subjects.insert("H 3001", "Agriculture");
        let html = detail_page("General Bill", "");
        let page = parse_bill_page(&html, URL, "2019-2020", Chamber::Lower, "H 3001", &subjects)
            .unwrap()
            .unwrap();
        assert!(page.bill.subjects.contains("Agriculture"));
    }

    #[test]
    fn test_action_row_with_wrong_cell_count() {
        let html = detail_page("General Bill", "<tr><td>01/15/20</td><td>House</td></tr>");
        assert!(matches!(parse(&html), Err(Error::Markup { .. })));
    }

    #[test]
    fn test_journal_citation_stripped() {
        assert_eq!(
            strip_journal_citation("Read second time (House Journal-page 5) (Senate Journal-page 9)"),
            "Read second time"
        );
        assert_eq!(strip_journal_citation("  Adopted  "), "Adopted");
    }

    #[test]
    fn test_versions_page() {
        let html = r#"<a href="/sess123_2019-2020/prever/3001_20200115.htm">Introduced</a>
            <a href="/sess123_2019-2020/prever/3001_20200130.htm">Amended</a>
            <a href="/other.htm">Help</a>"#;
        let versions = parse_versions_page(
            html,
            "https://www.scstatehouse.gov/sess123_2019-2020/versions.php",
        )
        .unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[1].0, "Amended");
    }

    #[test]
    fn test_prefiled_detection() {
        assert!(is_prefiled_document(
            "https://www.scstatehouse.gov/sess124_2021-2022/prefiles/Bills/3001.htm"
        ));
        assert!(!is_prefiled_document(
            "https://www.scstatehouse.gov/sess123_2019-2020/prever/3001_20200115.htm"
        ));
    }
}
