use crate::actions::ActionTag;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// One of the two legislative bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chamber {
    Upper,
    Lower,
}

impl Chamber {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "upper" | "senate" => Some(Chamber::Upper),
            "lower" | "house" => Some(Chamber::Lower),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Chamber::Upper => "upper",
            Chamber::Lower => "lower",
        }
    }

    /// Lowercase letter used in statehouse URLs and bill ids
    pub fn letter(&self) -> char {
        match self {
            Chamber::Upper => 's',
            Chamber::Lower => 'h',
        }
    }

    /// Name the statehouse uses for the chamber in listings
    pub fn body_name(&self) -> &'static str {
        match self {
            Chamber::Upper => "Senate",
            Chamber::Lower => "House",
        }
    }
}

impl fmt::Display for Chamber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who took an action: a chamber, or the legislature as a whole
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionChamber {
    Upper,
    Lower,
    Legislature,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BillClassification {
    #[serde(rename = "bill")]
    Bill,
    #[serde(rename = "resolution")]
    Resolution,
    #[serde(rename = "joint resolution")]
    JointResolution,
    #[serde(rename = "concurrent resolution")]
    ConcurrentResolution,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Person,
    Organization,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sponsorship {
    pub name: String,
    pub classification: String,
    pub entity_type: EntityType,
    pub primary: bool,
    pub chamber: Option<Chamber>,
}

impl Sponsorship {
    /// Primary sponsorship, the only kind the detail page lists
    pub fn primary(name: impl Into<String>, entity_type: EntityType, chamber: Option<Chamber>) -> Self {
        Self {
            name: name.into(),
            classification: "primary".to_string(),
            entity_type,
            primary: true,
            chamber,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionLink {
    pub note: String,
    pub url: String,
    pub media_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Abstract {
    #[serde(rename = "abstract")]
    pub text: String,
    pub note: String,
}

/// Source information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub description: String,
    pub date: NaiveDate,
    pub chamber: ActionChamber,
    pub classification: Vec<ActionTag>,
}

/// A bill and everything the detail page says about it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    pub identifier: String,
    pub legislative_session: String,
    pub chamber: Chamber,
    pub classification: BillClassification,
    pub title: String,
    pub abstracts: Vec<Abstract>,
    pub subjects: BTreeSet<String>,
    pub sponsorships: Vec<Sponsorship>,
    pub versions: Vec<VersionLink>,
    pub actions: Vec<Action>,
    /// Dedupe keys of the vote events recorded against this bill
    pub vote_events: Vec<String>,
    pub sources: Vec<Source>,
}

impl Bill {
    pub fn new(
        identifier: impl Into<String>,
        legislative_session: impl Into<String>,
        chamber: Chamber,
        title: impl Into<String>,
        classification: BillClassification,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            legislative_session: legislative_session.into(),
            chamber,
            classification,
            title: title.into(),
            abstracts: Vec::new(),
            subjects: BTreeSet::new(),
            sponsorships: Vec::new(),
            versions: Vec::new(),
            actions: Vec::new(),
            vote_events: Vec::new(),
            sources: Vec::new(),
        }
    }

    pub fn add_abstract(&mut self, text: impl Into<String>, note: impl Into<String>) {
        self.abstracts.push(Abstract {
            text: text.into(),
            note: note.into(),
        });
    }

    pub fn add_subject(&mut self, subject: impl Into<String>) {
        self.subjects.insert(subject.into());
    }

    pub fn add_sponsorship(&mut self, sponsorship: Sponsorship) {
        self.sponsorships.push(sponsorship);
    }

    /// Add a version document; a URL already listed is ignored
    pub fn add_version_link(
        &mut self,
        note: impl Into<String>,
        url: impl Into<String>,
        media_type: impl Into<String>,
    ) {
        let url = url.into();
        if self.versions.iter().any(|v| v.url == url) {
            return;
        }
        self.versions.push(VersionLink {
            note: note.into(),
            url,
            media_type: media_type.into(),
        });
    }

    pub fn add_action(&mut self, action: Action) {
        self.actions.push(action);
    }

    pub fn add_source(&mut self, url: impl Into<String>) {
        self.sources.push(Source {
            url: url.into(),
            note: String::new(),
        });
    }
}

/// Vote event result type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteEventResult {
    Pass,
    Fail,
}

impl From<&str> for VoteEventResult {
    fn from(s: &str) -> Self {
        match s.trim() {
            "Passed" => VoteEventResult::Pass,
            _ => VoteEventResult::Fail,
        }
    }
}

/// How a single legislator was recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteOption {
    Yes,
    No,
    Other,
    Excused,
    Paired,
}

impl VoteOption {
    /// Excused and paired voters are tallied as "other"
    pub fn is_other(&self) -> bool {
        matches!(self, VoteOption::Other | VoteOption::Excused | VoteOption::Paired)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCount {
    pub option: VoteOption,
    pub value: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonVote {
    pub option: VoteOption,
    pub voter_name: String,
}

/// A single roll-call vote on a bill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteEvent {
    pub legislative_session: String,
    pub chamber: Chamber,
    pub start_date: NaiveDate,
    pub motion_text: String,
    pub motion_classification: Vec<String>,
    pub result: VoteEventResult,
    pub counts: Vec<VoteCount>,
    pub votes: Vec<PersonVote>,
    pub bill_identifier: String,
    pub bill_chamber: Chamber,
    pub dedupe_key: Option<String>,
    pub sources: Vec<Source>,
}

impl VoteEvent {
    pub fn new(
        bill: &Bill,
        chamber: Chamber,
        start_date: NaiveDate,
        motion_text: impl Into<String>,
        result: VoteEventResult,
    ) -> Self {
        Self {
            legislative_session: bill.legislative_session.clone(),
            chamber,
            start_date,
            motion_text: motion_text.into(),
            motion_classification: vec!["passage".to_string()],
            result,
            counts: Vec::new(),
            votes: Vec::new(),
            bill_identifier: bill.identifier.clone(),
            bill_chamber: bill.chamber,
            dedupe_key: None,
            sources: Vec::new(),
        }
    }

    /// Set the tally for an option, replacing any previous value
    pub fn set_count(&mut self, option: VoteOption, value: u32) {
        match self.counts.iter_mut().find(|c| c.option == option) {
            Some(count) => count.value = value,
            None => self.counts.push(VoteCount { option, value }),
        }
    }

    pub fn count(&self, option: VoteOption) -> u32 {
        self.counts
            .iter()
            .find(|c| c.option == option)
            .map(|c| c.value)
            .unwrap_or(0)
    }

    pub fn vote(&mut self, option: VoteOption, voter_name: impl Into<String>) {
        self.votes.push(PersonVote {
            option,
            voter_name: voter_name.into(),
        });
    }

    pub fn yes_voters(&self) -> Vec<&str> {
        self.voters_where(|o| o == VoteOption::Yes)
    }

    pub fn no_voters(&self) -> Vec<&str> {
        self.voters_where(|o| o == VoteOption::No)
    }

    pub fn other_voters(&self) -> Vec<&str> {
        self.voters_where(|o| o.is_other())
    }

    fn voters_where(&self, keep: impl Fn(VoteOption) -> bool) -> Vec<&str> {
        self.votes
            .iter()
            .filter(|v| keep(v.option))
            .map(|v| v.voter_name.as_str())
            .collect()
    }

    pub fn add_source(&mut self, url: impl Into<String>) {
        self.sources.push(Source {
            url: url.into(),
            note: String::new(),
        });
    }
}

/// A record handed to the sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "_type")]
pub enum ScrapedRecord {
    #[serde(rename = "bill")]
    Bill(Bill),
    #[serde(rename = "vote_event")]
    Vote(VoteEvent),
}
