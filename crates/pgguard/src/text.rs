//! Case-insensitive text matching used by the statement guards.

/// Returns `true` if `needle` occurs in `haystack`, ignoring ASCII and Unicode case.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Returns `true` if any of `needles` occurs in `haystack`, ignoring case.
pub fn contains_any_ignore_case(haystack: &str, needles: &[&str]) -> bool {
    let haystack = haystack.to_lowercase();
    needles
        .iter()
        .any(|needle| haystack.contains(&needle.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_regardless_of_case() {
        let cases = [
            ("DELETE FROM t WHERE id = $1", "delete", true),
            ("delete FROM t WHERE id = $1", "DELETE", true),
            ("delete FROM t WHERE id = $1", "where", true),
            ("deLete FROM t WHERE id = $1", "delet", true),
            ("deLete * FROM t WHERE id = $1", "delett", false),
            ("select * FROM t WHERE id = $1 FOR UPDATE", "for update", true),
            ("select * FROM t WHERE id = $1 FOR UPDATE", "for select", false),
        ];
        for (haystack, needle, expected) in cases {
            assert_eq!(
                contains_ignore_case(haystack, needle),
                expected,
                "{haystack:?} contains {needle:?}"
            );
        }
    }

    #[test]
    fn any_of_several_needles() {
        let text = "watashi ha sample no text desu. こんにちは。";
        assert!(contains_any_ignore_case(text, &["sample", "ttt"]));
        assert!(!contains_any_ignore_case(text, &["watasu", "ttt"]));
        assert!(!contains_any_ignore_case(text, &[]));
    }
}
