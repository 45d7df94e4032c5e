//! Text similarity for the content-match strategy.
//!
//! Normalized Levenshtein distance over characters, with whitespace
//! collapsed first so reformatting alone does not push an element past
//! the threshold.

/// Collapse runs of whitespace to single spaces and trim.
pub fn normalize_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_ws = false;
    for c in s.chars() {
        if c.is_whitespace() {
            in_ws = true;
        } else {
            if in_ws && !out.is_empty() {
                out.push(' ');
            }
            in_ws = false;
            out.push(c);
        }
    }
    out
}

/// Edit distance divided by the longer length; 0.0 = identical,
/// 1.0 = nothing in common. Two empty strings are identical.
pub fn normalized_distance(a: &str, b: &str) -> f64 {
    1.0 - strsim::normalized_levenshtein(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_have_zero_distance() {
        assert_eq!(normalized_distance("Save", "Save"), 0.0);
        assert_eq!(normalized_distance("", ""), 0.0);
    }

    #[test]
    fn distance_scales_with_change() {
        let small = normalized_distance("Save changes", "Save change");
        let large = normalized_distance("Save changes", "Delete account");
        assert!(small < 0.2, "small edit should stay under threshold: {small}");
        assert!(large > 0.5, "rewrite should be far: {large}");
    }

    #[test]
    fn whitespace_normalization_collapses_runs() {
        assert_eq!(normalize_ws("  a \n\t b  "), "a b");
        assert_eq!(
            normalized_distance(&normalize_ws("Save  changes"), &normalize_ws("Save changes")),
            0.0
        );
    }

    #[test]
    fn empty_versus_nonempty_is_maximal() {
        assert_eq!(normalized_distance("", "abc"), 1.0);
    }

    #[test]
    fn distance_is_edit_count_over_longer_length() {
        // kitten -> sitting is three edits over seven characters.
        let d = normalized_distance("kitten", "sitting");
        assert!((d - 3.0 / 7.0).abs() < 1e-9, "unexpected distance: {d}");
    }
}
