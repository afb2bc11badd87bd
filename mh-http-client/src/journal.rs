//! Journal HTML parsing

use crate::error::SchemaError;
use crate::records::JournalSummary;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use std::sync::OnceLock;

/// Parser for the journal fragment with lazily compiled selector and pattern
#[derive(Clone, Debug, Default)]
pub(crate) struct JournalParser {
    summary_selector: OnceLock<Selector>,
    argument_regex: OnceLock<Regex>,
}

impl JournalParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Link whose `onclick` opens the log summary popup
    fn summary_selector(&self) -> &Selector {
        self.summary_selector
            .get_or_init(|| Selector::parse(r#"div[class*="log_summary"] a"#).unwrap())
    }

    /// Quoted strings and brace groups (up to three levels deep) in a JS call
    fn argument_regex(&self) -> &Regex {
        self.argument_regex.get_or_init(|| {
            Regex::new(r#""(?:[^"\\]|\\.)*"|\{(?:[^{}]|\{(?:[^{}]|\{[^{}]*\})*\})*\}"#).unwrap()
        })
    }

    /// Extract the summary from the journal fragment
    ///
    /// The link calls `showLogSummary(since, catches, bait, loot)`. Returns
    /// `Ok(None)` when the fragment has no summary link.
    pub fn parse_summary(&self, html: &str) -> Result<Option<JournalSummary>, SchemaError> {
        let fragment = Html::parse_fragment(html);
        let Some(link) = fragment.select(self.summary_selector()).next() else {
            return Ok(None);
        };

        let onclick = link.value().attr("onclick").unwrap_or_default();
        let arguments: Vec<&str> = self
            .argument_regex()
            .find_iter(onclick)
            .map(|m| m.as_str())
            .collect();

        if arguments.len() < 4 {
            return Err(SchemaError::new(
                "JournalSummary",
                format!("expected 4 summary arguments, found {}", arguments.len()),
            ));
        }

        let hunting_since: String = serde_json::from_str(arguments[0])
            .map_err(|e| SchemaError::new("JournalSummary", format!("hunting since: {e}")))?;
        let loot: Value = serde_json::from_str(arguments[3])
            .map_err(|e| SchemaError::new("JournalSummary", format!("loot: {e}")))?;
        let loot_count = loot
            .as_object()
            .map(|entries| entries.len())
            .ok_or_else(|| SchemaError::new("JournalSummary", "loot is not an object"))?;

        Ok(Some(JournalSummary {
            hunting_since,
            loot_count,
        }))
    }
}
