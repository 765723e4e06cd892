//! Course-code matching against timetable cell text.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AgendaError;

/// How a course code is compared with a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Cell text starts with the code as typed. A trailing space in the code
    /// only matches a whole word: `"ALGO "` matches `ALGO TP1` but not `ALGOX`.
    #[default]
    Prefix,
    /// The code's words must equal the cell's leading words.
    ExactToken,
}

impl FromStr for MatchMode {
    type Err = AgendaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "prefix" => Ok(MatchMode::Prefix),
            "exact_token" | "exact" => Ok(MatchMode::ExactToken),
            other => Err(AgendaError::Config(format!(
                "unknown match mode '{other}' (expected prefix or exact-token)"
            ))),
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMode::Prefix => f.write_str("prefix"),
            MatchMode::ExactToken => f.write_str("exact-token"),
        }
    }
}

/// Decides whether a cell belongs to the requested course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseMatcher {
    code: String,
    mode: MatchMode,
    types: Vec<String>,
}

impl CourseMatcher {
    pub fn new(code: impl Into<String>, mode: MatchMode) -> Self {
        CourseMatcher {
            code: code.into(),
            mode,
            types: Vec::new(),
        }
    }

    /// Only accept cells whose text also carries one of these course types
    /// (`TD`, `TP`, `CM`...). An empty list accepts every type.
    pub fn with_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.types = types
            .into_iter()
            .map(|t| t.as_ref().trim().to_uppercase())
            .filter(|t| !t.is_empty())
            .collect();
        self
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    pub fn matches(&self, text: &str) -> bool {
        let code_words: Vec<&str> = self.code.split_whitespace().collect();
        if code_words.is_empty() {
            return false;
        }

        let cleaned = clean_text(text);
        let code_found = match self.mode {
            MatchMode::Prefix => {
                let leading = self.code.trim_start();
                format!("{cleaned} ").starts_with(leading)
            }
            MatchMode::ExactToken => {
                let mut words = cleaned.split(' ');
                code_words.iter().all(|w| words.next() == Some(*w))
            }
        };
        if !code_found {
            return false;
        }

        if self.types.is_empty() {
            return true;
        }

        cleaned
            .split(' ')
            .skip(code_words.len())
            .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()).to_uppercase())
            .any(|word| self.types.iter().any(|t| word.starts_with(t.as_str())))
    }
}

/// Turn line breaks and tabs into spaces, collapse whitespace runs and trim.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_space_disambiguates_prefix() {
        let matcher = CourseMatcher::new("INFO V ", MatchMode::Prefix);
        assert!(matcher.matches("INFO V - CM LL"));
        assert!(!matcher.matches("INFO VI - CM LL"));
        // a cell holding only the code still matches
        assert!(matcher.matches("INFO V"));
    }

    #[test]
    fn test_prefix_without_space_matches_longer_codes() {
        let matcher = CourseMatcher::new("ALGO", MatchMode::Prefix);
        assert!(matcher.matches("ALGO TP1"));
        assert!(matcher.matches("ALGOX TD"));
        assert!(!matcher.matches("algo TP1"));
        assert!(!matcher.matches("Intro ALGO"));
    }

    #[test]
    fn test_exact_token_mode() {
        let matcher = CourseMatcher::new("ALGO", MatchMode::ExactToken);
        assert!(matcher.matches("ALGO TP1"));
        assert!(matcher.matches("ALGO\nTP1"));
        assert!(!matcher.matches("ALGOX TD"));

        let two_words = CourseMatcher::new("INFO V", MatchMode::ExactToken);
        assert!(two_words.matches("INFO V - CM LL"));
        assert!(!two_words.matches("INFO VI - CM LL"));
    }

    #[test]
    fn test_blank_code_matches_nothing() {
        assert!(!CourseMatcher::new("", MatchMode::Prefix).matches("ALGO"));
        assert!(!CourseMatcher::new("  ", MatchMode::ExactToken).matches("ALGO"));
    }

    #[test]
    fn test_course_type_filter() {
        let matcher = CourseMatcher::new("ALGO ", MatchMode::Prefix).with_types(["tp", "TD"]);
        assert!(matcher.matches("ALGO TP1"));
        assert!(matcher.matches("ALGO (TD2)"));
        assert!(!matcher.matches("ALGO CM"));
        assert!(!matcher.matches("ALGO"));

        let info = CourseMatcher::new("INFO V ", MatchMode::Prefix).with_types(["CM"]);
        assert!(info.matches("INFO V - CM LL"));
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  ALGO\nTP1\t\r Grp 3 "), "ALGO TP1 Grp 3");
        assert_eq!(clean_text("\n\t"), "");
    }

    #[test]
    fn test_match_mode_from_str() {
        assert_eq!("prefix".parse::<MatchMode>().unwrap(), MatchMode::Prefix);
        assert_eq!("exact-token".parse::<MatchMode>().unwrap(), MatchMode::ExactToken);
        assert_eq!("exact_token".parse::<MatchMode>().unwrap(), MatchMode::ExactToken);
        assert!("fuzzy".parse::<MatchMode>().is_err());
    }
}
