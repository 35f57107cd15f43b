//! Keyword scanning of user text.
//!
//! Two keyword lists are compiled to case-insensitive word-boundary
//! regexes at startup. The first blocking match decides; otherwise the
//! first warning match; otherwise the text is safe. No cryptographic
//! machinery participates here, the result is wrapped in the response
//! envelope like every other payload.

use hashscreen_types::ScanVerdict;
use regex::Regex;

/// The compiled keyword filter.
pub(crate) struct TextFilter {
    blocking: Vec<(String, Regex)>,
    warning: Vec<(String, Regex)>,
}

impl TextFilter {
    /// Compiles both keyword lists. Empty keywords are skipped.
    pub(crate) fn new(blocking: &[String], warning: &[String]) -> eyre::Result<Self> {
        Ok(Self {
            blocking: compile(blocking)?,
            warning: compile(warning)?,
        })
    }

    /// Scans a text, blocking list first.
    pub(crate) fn scan(&self, text: &str) -> ScanVerdict {
        for (keyword, regex) in &self.blocking {
            if regex.is_match(text) {
                return ScanVerdict::Blocked {
                    reason: format!("text contains the blocked keyword {keyword:?}"),
                    keyword: keyword.clone(),
                };
            }
        }
        for (keyword, regex) in &self.warning {
            if regex.is_match(text) {
                return ScanVerdict::Warning {
                    reason: format!("text contains the flagged keyword {keyword:?}"),
                    keyword: keyword.clone(),
                };
            }
        }
        ScanVerdict::Safe
    }
}

fn compile(keywords: &[String]) -> eyre::Result<Vec<(String, Regex)>> {
    keywords
        .iter()
        .filter(|keyword| !keyword.trim().is_empty())
        .map(|keyword| {
            let keyword = keyword.trim().to_owned();
            let regex = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(&keyword)))?;
            Ok((keyword, regex))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> TextFilter {
        TextFilter::new(
            &["forbidden".to_owned(), "prohibited".to_owned()],
            &["suspicious".to_owned()],
        )
        .unwrap()
    }

    #[test]
    fn clean_text_is_safe() {
        assert_eq!(filter().scan("a perfectly ordinary sentence"), ScanVerdict::Safe);
    }

    #[test]
    fn blocking_match_is_case_insensitive() {
        let verdict = filter().scan("this is FORBIDDEN content");
        assert!(matches!(
            verdict,
            ScanVerdict::Blocked { keyword, .. } if keyword == "forbidden"
        ));
    }

    #[test]
    fn blocking_wins_over_warning() {
        let verdict = filter().scan("suspicious and forbidden");
        assert!(matches!(verdict, ScanVerdict::Blocked { .. }));
    }

    #[test]
    fn warning_when_no_blocking_match() {
        let verdict = filter().scan("only mildly suspicious");
        assert!(matches!(
            verdict,
            ScanVerdict::Warning { keyword, .. } if keyword == "suspicious"
        ));
    }

    #[test]
    fn word_boundaries_are_respected() {
        // "forbiddenly" does not contain "forbidden" as a word.
        assert_eq!(filter().scan("forbiddenly good"), ScanVerdict::Safe);
    }
}
