//! Roll-call roster parsing.
//!
//! Roll-call documents are PDFs converted to layout text. A section header
//! ("YEAS", "NAYS", "EXCUSED", ...) opens a bucket and the following lines hold
//! the voters in columns separated by wide gutters.

use crate::error::{Error, Result};
use crate::types::{VoteEvent, VoteOption};
use regex::Regex;
use std::sync::OnceLock;

/// Where names are currently being recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    None,
    Yes,
    No,
    Other,
}

/// Why a voter in the other bucket did not vote yes or no
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtherReason {
    Excused,
    Paired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RosterState {
    pub bucket: Bucket,
    pub reason: Option<OtherReason>,
}

impl RosterState {
    pub const START: RosterState = RosterState {
        bucket: Bucket::None,
        reason: None,
    };

    /// State opened by a section header line, if the line is one
    pub fn for_header(line: &str) -> Option<RosterState> {
        let (bucket, reason) = if line.starts_with("YEAS") || line.starts_with("AYES") {
            (Bucket::Yes, None)
        } else if line.starts_with("NAYS") {
            (Bucket::No, None)
        } else if line.starts_with("EXCUSED")
            || line.starts_with("NOT VOTING")
            || line.starts_with("ABSTAIN")
        {
            (Bucket::Other, Some(OtherReason::Excused))
        } else if line.starts_with("PAIRED") {
            (Bucket::Other, Some(OtherReason::Paired))
        } else {
            return None;
        };
        Some(RosterState { bucket, reason })
    }

    /// Option recorded for a name read in this state
    pub fn option(&self) -> Option<VoteOption> {
        match (self.bucket, self.reason) {
            (Bucket::None, _) => None,
            (Bucket::Yes, _) => Some(VoteOption::Yes),
            (Bucket::No, _) => Some(VoteOption::No),
            (Bucket::Other, None) => Some(VoteOption::Other),
            (Bucket::Other, Some(OtherReason::Excused)) => Some(VoteOption::Excused),
            (Bucket::Other, Some(OtherReason::Paired)) => Some(VoteOption::Paired),
        }
    }
}

/// Columns are separated by three or more spaces
fn gutter_regex() -> Result<&'static Regex> {
    static GUTTER: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();
    GUTTER
        .get_or_init(|| Regex::new(r" {3,}"))
        .as_ref()
        .map_err(|e| Error::Regex(e.clone()))
}

/// Read voter names out of roll-call text and record them on the vote
pub fn parse_roster(vote: &mut VoteEvent, text: &str) -> Result<()> {
    let gutter = gutter_regex()?;
    let mut state = RosterState::START;

    for line in text.lines() {
        let line = line.trim();

        if let Some(next) = RosterState::for_header(line) {
            state = next;
            continue;
        }
        if line.is_empty() || line.starts_with("Page ") {
            continue;
        }

        let Some(option) = state.option() else {
            continue;
        };
        for name in gutter.split(line) {
            let name = name.trim();
            if !name.is_empty() {
                vote.vote(option, name);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Bill, BillClassification, Chamber, VoteEventResult};
    use chrono::NaiveDate;

    fn empty_vote() -> VoteEvent {
        let bill = Bill::new("S 1", "2019-2020", Chamber::Upper, "t", BillClassification::Bill);
        let date = NaiveDate::from_ymd_opt(2020, 2, 4).unwrap();
        VoteEvent::new(&bill, Chamber::Upper, date, "Third reading", VoteEventResult::Pass)
    }

    #[test]
    fn test_yeas_then_nays() {
        let mut vote = empty_vote();
        parse_roster(&mut vote, "YEAS\nSmith   Jones   Lee\nNAYS\nDoe\n").unwrap();

        assert_eq!(vote.yes_voters(), vec!["Smith", "Jones", "Lee"]);
        assert_eq!(vote.no_voters(), vec!["Doe"]);
        assert!(vote.other_voters().is_empty());
    }

    #[test]
    fn test_preamble_before_first_header_is_ignored() {
        let mut vote = empty_vote();
        let text = "Senate Roll Call\nS. 1   Third Reading\n\nAYES   2\nAlpha        Beta\n";
        parse_roster(&mut vote, text).unwrap();
        assert_eq!(vote.yes_voters(), vec!["Alpha", "Beta"]);
        assert!(vote.no_voters().is_empty());
    }

    #[test]
    fn test_other_buckets_carry_reason() {
        let mut vote = empty_vote();
        let text = "\
YEAS - 2
  Smith         Jones

Page 1 of 2
EXCUSED - 1
Brown
NOT VOTING
Green    White
PAIRED
Black
";
        parse_roster(&mut vote, text).unwrap();

        assert_eq!(vote.yes_voters(), vec!["Smith", "Jones"]);
        assert_eq!(vote.other_voters(), vec!["Brown", "Green", "White", "Black"]);
        let options: Vec<VoteOption> = vote.votes.iter().map(|v| v.option).collect();
        assert_eq!(
            options,
            vec![
                VoteOption::Yes,
                VoteOption::Yes,
                VoteOption::Excused,
                VoteOption::Excused,
                VoteOption::Excused,
                VoteOption::Paired,
            ]
        );
    }

    #[test]
    fn test_double_spaced_names_stay_whole() {
        let mut vote = empty_vote();
        parse_roster(&mut vote, "NAYS\nMcLeod  M.   Bennett").unwrap();
        assert_eq!(vote.no_voters(), vec!["McLeod  M.", "Bennett"]);
    }

    #[test]
    fn test_repeated_rosters_share_gutter_pattern() {
        let mut vote = empty_vote();
        parse_roster(&mut vote, "YEAS\nAlexander   Bennett").unwrap();
        let first = gutter_regex().unwrap();
        parse_roster(&mut vote, "NAYS\nCampsen   Davis").unwrap();
        assert!(std::ptr::eq(first, gutter_regex().unwrap()));
        assert_eq!(vote.no_voters(), vec!["Campsen", "Davis"]);
    }

    #[test]
    fn test_header_transitions() {
        assert_eq!(
            RosterState::for_header("ABSTAIN 0"),
            Some(RosterState {
                bucket: Bucket::Other,
                reason: Some(OtherReason::Excused)
            })
        );
        assert_eq!(RosterState::for_header("Smith"), None);
        assert_eq!(RosterState::START.option(), None);
    }
}
