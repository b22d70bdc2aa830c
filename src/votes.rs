use crate::convert::DocumentConverter;
use crate::error::{Error, Result};
use crate::fetch::Fetcher;
use crate::html::{absolute_url, Document, ElementRef};
use crate::rollcall::parse_roster;
use crate::scraper::ScrapeContext;
use crate::types::{Bill, Chamber, VoteEvent, VoteEventResult, VoteOption};
use chrono::NaiveDateTime;
use std::collections::HashSet;
use tracing::warn;

/// Cells of a vote listing row: timestamp, motion, roll-call link, yeas, nays,
/// not voting, excused, present, abstain, total, result
const VOTE_ROW_CELLS: usize = 11;
const TIMESTAMP_FORMAT: &str = "%m/%d/%Y %I:%M %p";

/// A listing row, before its roll-call document has been read
#[derive(Debug, Clone, PartialEq)]
pub struct VoteRow {
    pub vote: VoteEvent,
    pub rollcall_url: String,
}

/// Parse a vote history page into one row per recorded vote.
///
/// Rows with the wrong number of cells are skipped. Counts that do not add up
/// to the listed total are an error: the page cannot be trusted.
pub fn parse_vote_history(bill: &Bill, html: &str, page_url: &str) -> Result<Vec<VoteRow>> {
    let doc = Document::parse(html);
    let rows = doc
        .find_all("tr")
        .into_iter()
        .filter(|row| matches!(row.parent().map(|p| p.name()), Some("table") | Some("tbody")));

    let mut parsed = Vec::new();
    // The first two rows are headers
    for row in rows.skip(2) {
        let cells: Vec<ElementRef<'_>> = row.children().collect();
        if cells.len() != VOTE_ROW_CELLS {
            warn!("Irregular vote row ({} cells) at {}", cells.len(), page_url);
            continue;
        }
        parsed.push(parse_vote_row(bill, &cells, page_url)?);
    }
    Ok(parsed)
}

fn parse_vote_row(bill: &Bill, cells: &[ElementRef<'_>], page_url: &str) -> Result<VoteRow> {
    let timestamp = cell_text(&cells[0]);
    let start_date = NaiveDateTime::parse_from_str(&timestamp, TIMESTAMP_FORMAT)?.date();
    let motion = cell_text(&cells[1]);

    let yes = cell_count(&cells[3])?;
    let no = cell_count(&cells[4])?;
    let not_voting = cell_count(&cells[5])?;
    let excused = cell_count(&cells[6])?;
    let present = cell_count(&cells[7])?;
    let abstain = cell_count(&cells[8])?;
    let total = cell_count(&cells[9])?;
    // Counts come straight from the page, so a sum may not fit in u32
    let other = [excused, present, abstain]
        .into_iter()
        .try_fold(not_voting, u32::checked_add);
    let sum = other.and_then(|other| yes.checked_add(no)?.checked_add(other));
    let (Some(other), true) = (other, sum == Some(total)) else {
        return Err(Error::VoteCountMismatch {
            url: page_url.to_string(),
            yes,
            no,
            other: other.unwrap_or(u32::MAX),
            total,
        });
    };

    let result = VoteEventResult::from(cell_text(&cells[10]).as_str());

    let link = cells[2]
        .children_named("a")
        .next()
        .ok_or_else(|| Error::markup(page_url, "vote row has no roll-call link"))?;
    let chamber = if link.text().contains("[H]") {
        Chamber::Lower
    } else {
        Chamber::Upper
    };
    let href = link
        .attr("href")
        .ok_or_else(|| Error::markup(page_url, "roll-call link has no href"))?;
    let rollcall_url = absolute_url(page_url, href)?;

    let mut vote = VoteEvent::new(bill, chamber, start_date, motion, result);
    vote.set_count(VoteOption::Yes, yes);
    vote.set_count(VoteOption::No, no);
    vote.set_count(VoteOption::Other, other);
    vote.add_source(page_url);

    Ok(VoteRow { vote, rollcall_url })
}

fn cell_text(cell: &ElementRef<'_>) -> String {
    cell.text().replace('\u{a0}', " ").trim().to_string()
}

fn cell_count(cell: &ElementRef<'_>) -> Result<u32> {
    Ok(cell_text(cell).parse::<u32>()?)
}

/// Fetch a bill's vote history and read each roll-call document.
///
/// A roll call already in `seen` (or listed twice on this page) is skipped: the
/// statehouse links the same document from several listings. The caller is
/// responsible for adding the returned dedupe keys to `seen`.
pub fn scrape_vote_history<F, C>(
    ctx: &ScrapeContext<F, C>,
    bill: &Bill,
    url: &str,
    seen: &HashSet<String>,
) -> Result<Vec<VoteEvent>>
where
    F: Fetcher,
    C: DocumentConverter,
{
    let page = ctx.get(url)?;
    let rows = parse_vote_history(bill, &page.text(), url)?;

    let mut taken = HashSet::new();
    let mut votes = Vec::new();
    for VoteRow {
        mut vote,
        rollcall_url,
    } in rows
    {
        if seen.contains(&rollcall_url) || !taken.insert(rollcall_url.clone()) {
            warn!("Duplicate usage of {}, skipping", rollcall_url);
            continue;
        }

        let text = ctx.document_text(&rollcall_url)?;
        parse_roster(&mut vote, &text)?;
        vote.add_source(rollcall_url.clone());
        vote.dedupe_key = Some(rollcall_url);
        votes.push(vote);
    }
    Ok(votes)
}
