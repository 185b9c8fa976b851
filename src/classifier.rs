//! Bounce subject classification
//!
//! Matches a message subject against an ordered set of configured
//! expressions. Classification never fails: an unmatchable or empty
//! subject is simply not a bounce.

use regex::{Regex, RegexBuilder};
use tracing::warn;

/// Subjects that indicate a non-delivery notification. Checked in
/// order, first match wins.
pub const DEFAULT_BOUNCE_PATTERNS: &[&str] = &[
    "mail delivery failed",
    "delivery status notification",
    "undeliverable",
    "undelivered mail",
    "returned mail",
    "failure notice",
    "delivery failure",
    "could not be delivered",
    "mail system error",
];

/// Subjects that indicate an automated reply rather than a bounce.
const AUTO_REPLY_PATTERNS: &[&str] = &[
    "out of office",
    "auto.?reply",
    "automatic reply",
    "vacation",
    "away from office",
];

/// Compiled classifier over an ordered pattern set.
pub struct BounceClassifier {
    bounce: Vec<Regex>,
    auto_reply: Vec<Regex>,
}

impl BounceClassifier {
    /// Compile the given expressions case-insensitively, keeping
    /// their order. Expressions that fail to compile are skipped with
    /// a warning; construction itself never fails.
    #[must_use]
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        Self {
            bounce: compile(patterns),
            auto_reply: compile(AUTO_REPLY_PATTERNS),
        }
    }

    /// Classifier over the built-in pattern set.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_BOUNCE_PATTERNS)
    }

    /// Built-in patterns with extra expressions checked first.
    #[must_use]
    pub fn with_extra_patterns<S: AsRef<str>>(extra: &[S]) -> Self {
        let mut patterns: Vec<&str> = extra.iter().map(AsRef::as_ref).collect();
        patterns.extend_from_slice(DEFAULT_BOUNCE_PATTERNS);
        Self::new(&patterns)
    }

    /// True iff the subject is non-empty and some pattern matches.
    #[must_use]
    pub fn is_bounce(&self, subject: &str) -> bool {
        if subject.is_empty() {
            return false;
        }
        self.bounce.iter().any(|re| re.is_match(subject))
    }

    /// True when the text looks like an out-of-office style
    /// auto-responder rather than a delivery failure.
    #[must_use]
    pub fn is_auto_reply(&self, text: &str) -> bool {
        !text.is_empty() && self.auto_reply.iter().any(|re| re.is_match(text))
    }
}

fn compile<S: AsRef<str>>(patterns: &[S]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|p| {
            let pattern = p.as_ref();
            match RegexBuilder::new(pattern).case_insensitive(true).build() {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!("Skipping invalid pattern '{}': {}", pattern, e);
                    None
                }
            }
        })
        .collect()
}
