//! Required-keyword gate applied before any code runs.
//!
//! Matching is a case-insensitive substring test, not a token match: `for` is
//! satisfied by `format(...)`.

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeywordCheck {
    pub valid: bool,
    /// Tokens not found in the source, in the order they were configured.
    pub missing: Vec<String>,
}

/// Split a comma-separated keyword list into trimmed, lowercased, non-empty tokens.
pub fn parse_keywords(required: &str) -> Vec<String> {
    required
        .split(',')
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

pub fn check_keywords(source: &str, required: Option<&str>) -> KeywordCheck {
    let tokens = required.map(parse_keywords).unwrap_or_default();
    if tokens.is_empty() {
        return KeywordCheck { valid: true, missing: Vec::new() };
    }

    let haystack = source.to_lowercase();
    let missing: Vec<String> = tokens
        .into_iter()
        .filter(|k| !haystack.contains(k.as_str()))
        .collect();
    KeywordCheck { valid: missing.is_empty(), missing }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_requirement_always_passes() {
        for req in [None, Some(""), Some("   "), Some(" , ,")] {
            let check = check_keywords("anything", req);
            assert!(check.valid);
            assert!(check.missing.is_empty());
        }
    }

    #[test]
    fn all_tokens_present() {
        let src = "for i in range(3):\n    print(i)";
        assert_eq!(
            check_keywords(src, Some("for,print")),
            KeywordCheck { valid: true, missing: vec![] }
        );
    }

    #[test]
    fn reports_missing_in_configured_order() {
        let check = check_keywords("x = 1", Some(" While , print,def "));
        assert!(!check.valid);
        assert_eq!(check.missing, vec!["while", "print", "def"]);
    }

    #[test]
    fn match_is_case_insensitive_substring() {
        assert!(check_keywords("PRINT('x')", Some("print")).valid);
        // substring, not word boundary
        assert!(check_keywords("print('{}'.format(1))", Some("for")).valid);
    }

    #[test]
    fn duplicates_are_kept() {
        assert_eq!(parse_keywords("for, FOR ,range"), vec!["for", "for", "range"]);
        let check = check_keywords("x", Some("for,for"));
        assert_eq!(check.missing, vec!["for", "for"]);
    }
}
