//! Announcements and their ordering key

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::LatestSelection;

static DIGIT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+").expect("digit pattern is valid"));

/// One entry of the announcement feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    #[serde(rename = "filename")]
    pub identifier: String,
    #[serde(default)]
    pub content: String,
}

impl Announcement {
    pub fn new(identifier: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            content: content.into(),
        }
    }

    pub fn ordinal(&self) -> u64 {
        extract_ordinal(&self.identifier)
    }
}

/// Extract the ordering number from an identifier such as `24.txt`.
///
/// Takes the first run of decimal digits anywhere in the identifier. Returns 0
/// when there are no digits and saturates at `u64::MAX` for runs too long to
/// fit.
pub fn extract_ordinal(identifier: &str) -> u64 {
    match DIGIT_RUN.find(identifier) {
        Some(run) => run.as_str().parse().unwrap_or(u64::MAX),
        None => 0,
    }
}

/// Pick the announcement that counts as the latest one in a feed response
pub fn select_latest(
    announcements: &[Announcement],
    selection: LatestSelection,
) -> Option<&Announcement> {
    match selection {
        LatestSelection::First => announcements.first(),
        LatestSelection::MaxOrdinal => announcements.iter().fold(None, |best, candidate| {
            match best {
                Some(best) if best.ordinal() >= candidate.ordinal() => Some(best),
                _ => Some(candidate),
            }
        }),
    }
}
