//! `%` wildcard matching for environment ids.
use regex::Regex;

pub const WILDCARD: char = '%';

/// Expand wildcard patterns against a list of subjects.
///
/// Patterns without a `%` are returned as-is, whether or not they exist in `subjects`, so
/// callers can report them as not found. A `%` matches any sequence of zero or more characters.
/// The result contains no duplicates and keeps the order in which ids were first produced.
///
/// `test%` therefore also matches `testing-2`; `test-%` excludes it and matches only `test-`
/// prefixed ids.
pub fn select<'a, I>(subjects: I, patterns: &[String]) -> Result<Vec<String>, regex::Error>
where
    I: IntoIterator<Item = &'a str>,
    I::IntoIter: Clone,
{
    let subjects = subjects.into_iter();
    let mut found: Vec<String> = Vec::new();

    for pattern in patterns {
        if !pattern.contains(WILDCARD) {
            push_unique(&mut found, pattern);
            continue;
        }

        let regex = to_regex(pattern)?;
        for subject in subjects.clone().filter(|subject| regex.is_match(subject)) {
            push_unique(&mut found, subject);
        }
    }

    Ok(found)
}

fn to_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let body = regex::escape(pattern).replace(WILDCARD, ".*");
    Regex::new(&format!("^{body}$"))
}

fn push_unique(found: &mut Vec<String>, value: &str) {
    if !found.iter().any(|existing| existing == value) {
        found.push(value.to_string());
    }
}

/// Split multi-value arguments on commas and whitespace.
///
/// `["a,b c", "d"]` becomes `["a", "b", "c", "d"]`. Empty fragments are dropped.
pub fn split_list(values: &[String]) -> Vec<String> {
    values
        .iter()
        .flat_map(|value| value.split(|c: char| c == ',' || c.is_whitespace()))
        .filter(|fragment| !fragment.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDS: [&str; 4] = ["test", "test-1", "testing-2", "prod"];

    fn patterns(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_plain_ids_pass_through() {
        let found = select(IDS, &patterns(&["prod", "missing"])).unwrap();
        assert_eq!(found, vec!["prod", "missing"]);
    }

    #[test]
    fn test_trailing_wildcard_matches_zero_or_more_characters() {
        let found = select(IDS, &patterns(&["test%"])).unwrap();
        assert_eq!(found, vec!["test", "test-1", "testing-2"]);
    }

    #[test]
    fn test_wildcard_with_separator() {
        let found = select(IDS, &patterns(&["test-%"])).unwrap();
        assert_eq!(found, vec!["test-1"]);
    }

    #[test]
    fn test_internal_wildcard() {
        let found = select(IDS, &patterns(&["t%-%"])).unwrap();
        assert_eq!(found, vec!["test-1", "testing-2"]);
    }

    #[test]
    fn test_wildcard_without_match() {
        let found = select(IDS, &patterns(&["staging%"])).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let found = select(IDS, &patterns(&["TEST%", "Prod"])).unwrap();
        assert_eq!(found, vec!["Prod"]);
    }

    #[test]
    fn test_regex_characters_are_literal() {
        let found = select(["a.b", "axb"], &patterns(&["a.%"])).unwrap();
        assert_eq!(found, vec!["a.b"]);
    }

    #[test]
    fn test_duplicates_collapse() {
        let found = select(IDS, &patterns(&["test", "test%", "%1"])).unwrap();
        assert_eq!(found, vec!["test", "test-1", "testing-2"]);
    }

    #[test]
    fn test_split_list() {
        let values = patterns(&["a,b c", "d", " ,e,, "]);
        assert_eq!(split_list(&values), vec!["a", "b", "c", "d", "e"]);
    }
}
