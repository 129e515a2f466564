//! Log text -> ReasonCode.
//!
//! An ordered rule list, most specific signal first. The first rule that
//! matches decides, regardless of where in the log the match occurs.
//! Patterns never match across a line break (`.` excludes `\n`).

use crate::reason::ReasonCode;
use once_cell::sync::Lazy;
use regex::Regex;

/// How a rule recognises its signal
enum Matcher {
    /// Any of these case-sensitive substrings
    Substrings(&'static [&'static str]),
    /// Single-line regex
    Pattern(Regex),
}

impl Matcher {
    fn matches(&self, text: &str) -> bool {
        match self {
            Matcher::Substrings(needles) => needles.iter().any(|n| text.contains(n)),
            Matcher::Pattern(re) => re.is_match(text),
        }
    }
}

/// One classification rule
pub struct Rule {
    pub reason: ReasonCode,
    matcher: Matcher,
}

impl Rule {
    pub fn matches(&self, text: &str) -> bool {
        self.matcher.matches(text)
    }
}

const TIME_SIGNALS: &[&str] = &["second time limit exceeded"];

const FILESYSTEM_SIGNALS: &[&str] = &[
    "Fatal error: can't write",
    "Fatal error: can't close",
    "File too big",
    "/bigobj",
    "No matching files were found",
];

const INTERNAL_ERROR_SIGNALS: &[&str] = &["internal compiler error", "internal error"];

fn pattern(expr: &str) -> Matcher {
    match Regex::new(expr) {
        Ok(re) => Matcher::Pattern(re),
        // Only reachable if a literal below is edited into an invalid regex
        Err(_) => Matcher::Substrings(&[]),
    }
}

static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        Rule {
            reason: ReasonCode::Time,
            matcher: Matcher::Substrings(TIME_SIGNALS),
        },
        Rule {
            reason: ReasonCode::Filesystem,
            matcher: Matcher::Substrings(FILESYSTEM_SIGNALS),
        },
        Rule {
            reason: ReasonCode::InternalError,
            matcher: Matcher::Substrings(INTERNAL_ERROR_SIGNALS),
        },
        Rule {
            reason: ReasonCode::CompileFail,
            matcher: pattern(r"Compile.+fail"),
        },
        Rule {
            reason: ReasonCode::LinkFail,
            matcher: pattern(r"Link.+fail"),
        },
        Rule {
            reason: ReasonCode::RunFail,
            matcher: pattern(r"Run.+fail"),
        },
    ]
});

/// The rule list in evaluation order
pub fn rules() -> &'static [Rule] {
    &RULES
}

/// Classify a log. Total: falls back to `Unknown` when no rule matches.
pub fn classify(log: &str) -> ReasonCode {
    rules()
        .iter()
        .find(|rule| rule.matches(log))
        .map(|rule| rule.reason)
        .unwrap_or(ReasonCode::Unknown)
}
