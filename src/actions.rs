//! Classification of free-text bill actions into the Open States action taxonomy.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical action type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionTag {
    Introduction,
    Filing,
    #[serde(rename = "reading-1")]
    Reading1,
    #[serde(rename = "reading-2")]
    Reading2,
    #[serde(rename = "reading-3")]
    Reading3,
    Passage,
    Failure,
    ReferralCommittee,
    CommitteePassage,
    CommitteePassageFavorable,
    AmendmentPassage,
    AmendmentAmendment,
    AmendmentDeferral,
    ExecutiveSignature,
    ExecutiveVeto,
    ExecutiveVetoLineItem,
    VetoOverridePassage,
    VetoOverrideFailure,
}

impl ActionTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionTag::Introduction => "introduction",
            ActionTag::Filing => "filing",
            ActionTag::Reading1 => "reading-1",
            ActionTag::Reading2 => "reading-2",
            ActionTag::Reading3 => "reading-3",
            ActionTag::Passage => "passage",
            ActionTag::Failure => "failure",
            ActionTag::ReferralCommittee => "referral-committee",
            ActionTag::CommitteePassage => "committee-passage",
            ActionTag::CommitteePassageFavorable => "committee-passage-favorable",
            ActionTag::AmendmentPassage => "amendment-passage",
            ActionTag::AmendmentAmendment => "amendment-amendment",
            ActionTag::AmendmentDeferral => "amendment-deferral",
            ActionTag::ExecutiveSignature => "executive-signature",
            ActionTag::ExecutiveVeto => "executive-veto",
            ActionTag::ExecutiveVetoLineItem => "executive-veto-line-item",
            ActionTag::VetoOverridePassage => "veto-override-passage",
            ActionTag::VetoOverrideFailure => "veto-override-failure",
        }
    }
}

impl fmt::Display for ActionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

use ActionTag::*;

/// Prefix rules, scanned top to bottom. A prefix that extends another one must
/// stay above it.
// http://www.scstatehouse.gov/actionsearch.php lists the phrasing in use
const RULES: &[(&str, &[ActionTag])] = &[
    ("Adopted", &[Passage]),
    ("Amended and adopted", &[Passage, AmendmentPassage]),
    ("Amended", &[AmendmentPassage]),
    ("Certain items vetoed", &[ExecutiveVetoLineItem]),
    ("Committed to", &[ReferralCommittee]),
    ("Committee Amendment Adopted", &[AmendmentPassage]),
    (
        "Committee Amendment Amended and Adopted",
        &[AmendmentPassage, AmendmentAmendment],
    ),
    ("Committee Amendment Amended", &[AmendmentAmendment]),
    ("Committee Amendment Tabled", &[AmendmentDeferral]),
    ("Committee report: Favorable", &[CommitteePassageFavorable]),
    ("Committee report: Majority favorable", &[CommitteePassage]),
    ("House amendment amended", &[AmendmentAmendment]),
    ("Introduced and adopted", &[Introduction, Passage]),
    ("Introduced, adopted", &[Introduction, Passage]),
    ("Introduced and read first time", &[Introduction, Reading1]),
    ("Introduced, read first time", &[Introduction, Reading1]),
    ("Introduced", &[Introduction]),
    ("Prefiled", &[Filing]),
    ("Read second time", &[Reading2]),
    ("Read third time", &[Passage, Reading3]),
    ("Recommitted to Committee", &[ReferralCommittee]),
    ("Referred to Committee", &[ReferralCommittee]),
    ("Rejected", &[Failure]),
    ("Senate amendment amended", &[AmendmentAmendment]),
    ("Signed by governor", &[ExecutiveSignature]),
    ("Tabled", &[Failure]),
    ("Veto overridden", &[VetoOverridePassage]),
    ("Veto sustained", &[VetoOverrideFailure]),
    ("Vetoed by Governor", &[ExecutiveVeto]),
];

/// Classify an action description. Returns an empty slice when no rule
/// matches, which is the normal outcome for procedural actions.
pub fn classify_action(action: &str) -> &'static [ActionTag] {
    let action = action.trim_start().to_lowercase();
    RULES
        .iter()
        .find(|(prefix, _)| action.starts_with(&prefix.to_lowercase()))
        .map(|(_, tags)| *tags)
        .unwrap_or(&[])
}
