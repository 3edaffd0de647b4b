//! PHI/PII de-identification.
//!
//! Pure text-to-text redaction applied before any note text leaves the process.
//! Rules run in a fixed order, each over the output of the previous one. No state,
//! no I/O, and the input is never logged.

use regex::Regex;
use serde::Serialize;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// One ordered redaction step: every match of `pattern` becomes `replacement`.
pub struct RedactionRule {
    pub name: &'static str,
    pub pattern: Regex,
    pub replacement: &'static str,
}

impl RedactionRule {
    fn new(name: &'static str, pattern: &str, replacement: &'static str) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).expect("Invalid regex: redaction rule"),
            replacement,
        }
    }
}

// Order matters: phone before SSN, 9+ digit ids before the labelled MRN/account forms.
static RULES: LazyLock<Vec<RedactionRule>> = LazyLock::new(|| {
    vec![
        RedactionRule::new("phone", r"\b\d{3}[-.\s]?\d{3}[-.\s]?\d{4}\b", "[PHONE]"),
        RedactionRule::new("ssn", r"\b\d{3}-\d{2}-\d{4}\b", "[SSN]"),
        RedactionRule::new("date_slash", r"\b\d{1,2}/\d{1,2}/\d{2,4}\b", "[DATE]"),
        RedactionRule::new("date_dash", r"\b\d{1,2}-\d{1,2}-\d{2,4}\b", "[DATE]"),
        RedactionRule::new("email", r"\b\S+@\S+\.\S+\b", "[EMAIL]"),
        RedactionRule::new("long_id", r"\b\d{9,}\b", "[ID]"),
        RedactionRule::new("mrn", r"(?i)\bMRN[-\s]?\d{6,}\b", "[MRN]"),
        RedactionRule::new("account", r"(?i)\bAccount\s*[-#]?\s*\d{6,}\b", "[ACCOUNT]"),
    ]
});

/// Every rule needs a digit or an `@` to match and no replacement token contains
/// either, so each changing pass strictly shrinks that count. This bounds the
/// fixpoint loop.
const MAX_PASSES: usize = 16;

/// How many substitutions each rule made. Safe to log: counts only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RedactionReport {
    pub counts: BTreeMap<&'static str, usize>,
}

impl RedactionReport {
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}

/// Stateless PHI redactor over the fixed rule chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhiRedactor;

impl PhiRedactor {
    pub fn new() -> Self {
        Self
    }

    pub fn rules(&self) -> &'static [RedactionRule] {
        &RULES
    }

    pub fn redact(&self, text: &str) -> String {
        self.redact_with_report(text).0
    }

    /// Redacts `text` and reports substitution counts per rule.
    ///
    /// The chain is re-applied until nothing changes, which makes
    /// `redact(redact(x)) == redact(x)` hold for every input.
    pub fn redact_with_report(&self, text: &str) -> (String, RedactionReport) {
        let mut report = RedactionReport::default();
        let mut current = text.to_string();

        for _ in 0..MAX_PASSES {
            let mut changed = false;
            for rule in RULES.iter() {
                let hits = rule.pattern.find_iter(&current).count();
                if hits == 0 {
                    continue;
                }
                if let Cow::Owned(next) = rule.pattern.replace_all(&current, rule.replacement) {
                    current = next;
                    changed = true;
                    *report.counts.entry(rule.name).or_default() += hits;
                }
            }
            if !changed {
                break;
            }
        }

        (current, report)
    }
}
