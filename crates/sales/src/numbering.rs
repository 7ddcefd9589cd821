//! Human-readable document numbers: prefix letter + zero-padded sequence.

/// Sequence part of `number` if it carries `prefix` followed only by digits.
pub fn parse_sequence(prefix: &str, number: &str) -> Option<u64> {
    let digits = number.strip_prefix(prefix)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

pub fn format_number(prefix: &str, sequence: u64, width: usize) -> String {
    format!("{prefix}{sequence:0width$}")
}

/// Next number for `prefix`: one past the highest sequence already issued.
///
/// Numbers with other prefixes (or malformed ones) are ignored, so gaps left
/// by deleted documents are never reused below the current maximum.
pub fn next_number<'a>(
    prefix: &str,
    width: usize,
    existing: impl IntoIterator<Item = &'a str>,
) -> String {
    let max = existing
        .into_iter()
        .filter_map(|number| parse_sequence(prefix, number))
        .max()
        .unwrap_or(0);
    format_number(prefix, max + 1, width)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn first_number_is_one() {
        assert_eq!(next_number("Q", 5, std::iter::empty()), "Q00001");
    }

    #[test]
    fn continues_from_the_maximum_of_its_own_prefix() {
        let existing = ["Q00001", "Q00007", "I00020", "Q00003", "QX0009", "legacy"];
        assert_eq!(next_number("Q", 5, existing), "Q00008");
        assert_eq!(next_number("I", 5, existing), "I00021");
    }

    #[test]
    fn sequence_may_outgrow_the_width() {
        assert_eq!(next_number("I", 2, ["I99"]), "I100");
        assert_eq!(parse_sequence("I", "I100"), Some(100));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Property: issuing numbers one after another yields strictly increasing, unique sequences.
        #[test]
        fn numbers_strictly_increase(count in 1usize..60, width in 1usize..8) {
            let mut issued: Vec<String> = Vec::new();
            for _ in 0..count {
                let next = next_number("Q", width, issued.iter().map(String::as_str));
                prop_assert!(!issued.contains(&next));
                if let Some(last) = issued.last() {
                    prop_assert!(parse_sequence("Q", &next) > parse_sequence("Q", last));
                }
                issued.push(next);
            }
        }
    }
}
