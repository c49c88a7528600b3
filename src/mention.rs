//! Brand-mention scoring for a single LLM answer
//!
//! A plain textual heuristic. The answer is lowercased and searched for the
//! brand and the target domain; the earliest hit and the presence of
//! competitor-framing cues decide the tier:
//!
//! | Tier | Score | Condition |
//! |------|-------|-----------|
//! | `not_mentioned` | 0 | neither brand nor domain occurs |
//! | `core_mention` | 100 | earliest hit before char 350, no competitor cue |
//! | `competitive_mention` | 70 | any competitor cue, wherever the hit is |
//! | `minor_mention` | 35 | otherwise |
//! | `not_available` | 0 | no answer at all; excluded from averages |

use crate::logging::log_trace;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Earliest-mention cutoff for a core mention, in characters
pub const CORE_MENTION_WINDOW_CHARS: usize = 350;

/// Phrases that frame the answer as a comparison between vendors
pub const COMPETITOR_CUES: [&str; 6] = [
    " versus ",
    " vs ",
    "compared",
    "alternative",
    "other options",
    "competitor",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MentionTier {
    NotMentioned,
    CoreMention,
    CompetitiveMention,
    MinorMention,
    /// The provider never produced a usable answer
    NotAvailable,
}

impl MentionTier {
    pub fn score(&self) -> u32 {
        match self {
            MentionTier::NotMentioned => 0,
            MentionTier::CoreMention => 100,
            MentionTier::CompetitiveMention => 70,
            MentionTier::MinorMention => 35,
            MentionTier::NotAvailable => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MentionTier::NotMentioned => "not_mentioned",
            MentionTier::CoreMention => "core_mention",
            MentionTier::CompetitiveMention => "competitive_mention",
            MentionTier::MinorMention => "minor_mention",
            MentionTier::NotAvailable => "not_available",
        }
    }

    /// Score table for the four answer tiers, as published in report metadata.
    pub fn weights() -> BTreeMap<MentionTier, u32> {
        [
            MentionTier::NotMentioned,
            MentionTier::MinorMention,
            MentionTier::CompetitiveMention,
            MentionTier::CoreMention,
        ]
        .into_iter()
        .map(|tier| (tier, tier.score()))
        .collect()
    }
}

impl fmt::Display for MentionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tier, its score and a human-readable reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentionScore {
    pub tier: MentionTier,
    pub score: u32,
    pub reason: String,
}

impl MentionScore {
    fn of(tier: MentionTier, reason: &str) -> Self {
        Self {
            tier,
            score: tier.score(),
            reason: reason.to_string(),
        }
    }

    /// Sentinel for a provider call that failed outright.
    pub fn not_available(reason: impl Into<String>) -> Self {
        Self {
            tier: MentionTier::NotAvailable,
            score: MentionTier::NotAvailable.score(),
            reason: reason.into(),
        }
    }
}

/// Lowercased host of `url` without a leading `www.`.
///
/// Accepts bare hosts (`acme.com`) as well as full URLs. Path, port and
/// userinfo are dropped.
pub fn normalize_domain(url: &str) -> String {
    let trimmed = url.trim();
    let without_scheme = match trimmed.find("://") {
        Some(index) => &trimmed[index + 3..],
        None => trimmed.trim_start_matches("//"),
    };
    let authority = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    let host = authority
        .rsplit('@')
        .next()
        .and_then(|host| host.split(':').next())
        .unwrap_or_default()
        .to_lowercase();

    host.strip_prefix("www.").unwrap_or(&host).to_string()
}

/// Brand to search for: the override (trimmed, lowercased) when given,
/// otherwise the first label of the target domain.
pub fn extract_brand(target_url: &str, brand_override: Option<&str>) -> String {
    if let Some(brand) = brand_override.map(str::trim).filter(|b| !b.is_empty()) {
        return brand.to_lowercase();
    }

    normalize_domain(target_url)
        .split('.')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Character index of the first occurrence of `needle` in `haystack`.
fn char_position(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    haystack
        .find(needle)
        .map(|byte_index| haystack[..byte_index].chars().count())
}

/// Classify one answer against the target's brand and domain.
pub fn evaluate_mention(response_text: &str, target_url: &str, brand: &str) -> MentionScore {
    let text = response_text.to_lowercase();
    let domain = normalize_domain(target_url);
    let brand = brand.trim().to_lowercase();

    let earliest = [char_position(&text, &brand), char_position(&text, &domain)]
        .into_iter()
        .flatten()
        .min();

    let Some(position) = earliest else {
        return MentionScore::of(
            MentionTier::NotMentioned,
            "No brand/domain mention detected.",
        );
    };

    let competitor_framed = COMPETITOR_CUES.iter().any(|cue| text.contains(cue));
    log_trace!(
        position = position,
        competitor_framed = competitor_framed,
        "Brand mention located"
    );

    if position < CORE_MENTION_WINDOW_CHARS && !competitor_framed {
        return MentionScore::of(
            MentionTier::CoreMention,
            "Brand appears in the core answer section.",
        );
    }
    if competitor_framed {
        return MentionScore::of(
            MentionTier::CompetitiveMention,
            "Brand/domain is mentioned alongside competitor framing.",
        );
    }
    MentionScore::of(
        MentionTier::MinorMention,
        "Brand/domain appears only outside the core answer section.",
    )
}
