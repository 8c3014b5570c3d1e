//! Natural-key normalisation.
//!
//! Entities are matched by their human-meaningful name or title rather than
//! by any identifier carried in a snapshot. Matching is case-insensitive and
//! ignores surrounding whitespace.

/// Normalise a name or title into its lookup form.
pub fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Return the trimmed name if it is present and non-blank.
pub fn present(name: Option<&str>) -> Option<&str> {
    name.map(str::trim).filter(|s| !s.is_empty())
}

/// Join already-rendered parts into a composite key.
pub fn composite<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for (i, part) in parts.into_iter().enumerate() {
        if i > 0 {
            out.push('\u{1f}');
        }
        out.push_str(part.as_ref());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_is_case_and_whitespace_insensitive() {
        assert_eq!(normalize("  Expand EU "), "expand eu");
        assert_eq!(normalize("GROWTH"), normalize("growth"));
    }

    #[test]
    fn present_rejects_blank() {
        assert_eq!(present(Some("  ")), None);
        assert_eq!(present(None), None);
        assert_eq!(present(Some(" Growth ")), Some("Growth"));
    }

    #[test]
    fn composite_keeps_part_boundaries() {
        assert_ne!(composite(["a:b", "c"]), composite(["a", "b:c"]));
        assert_eq!(composite(["1", "2"]), composite(vec![String::from("1"), String::from("2")]));
    }
}
