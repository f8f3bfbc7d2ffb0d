//! Output Comparator (C5, §4.5): line-based exact / whitespace-tolerant
//! comparison producing `Accepted`, `Presentation Error`, or `Wrong Answer`.

use crate::verdict::Verdict;

/// Compare actual program output against the expected output for one test
/// case. Trailing whitespace is trimmed from both sides before splitting
/// into lines; line counts must match exactly.
pub fn compare(actual: &str, expected: &str) -> Verdict {
    let actual_lines: Vec<&str> = actual.trim_end().lines().collect();
    let expected_lines: Vec<&str> = expected.trim_end().lines().collect();

    if actual_lines.len() != expected_lines.len() {
        return Verdict::WrongAnswer;
    }

    let mut presentation_only = false;
    for (a, e) in actual_lines.iter().zip(expected_lines.iter()) {
        let a = a.trim_end_matches(['\r', '\n']);
        let e = e.trim_end_matches(['\r', '\n']);

        if a == e {
            continue;
        }
        if a.trim() == e.trim() {
            presentation_only = true;
            continue;
        }
        return Verdict::WrongAnswer;
    }

    if presentation_only {
        Verdict::PresentationError
    } else {
        Verdict::Accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_is_accepted() {
        assert_eq!(compare("hi\n", "hi\n"), Verdict::Accepted);
    }

    #[test]
    fn differing_line_count_is_wrong_answer() {
        assert_eq!(compare("1\n2\n", "1\n"), Verdict::WrongAnswer);
    }

    #[test]
    fn whitespace_only_difference_is_presentation_error() {
        assert_eq!(compare("1  2  3\n", "1 2 3\n"), Verdict::PresentationError);
    }

    #[test]
    fn content_difference_is_wrong_answer() {
        assert_eq!(compare("41\n", "42\n"), Verdict::WrongAnswer);
    }

    #[test]
    fn trailing_blank_lines_are_trimmed_before_comparison() {
        assert_eq!(compare("hi\n\n\n", "hi\n"), Verdict::Accepted);
    }

    #[test]
    fn presentation_error_requires_at_least_one_strict_mismatch() {
        // One line matches exactly, one matches only loosely -> still PE.
        assert_eq!(
            compare("same\n1  2\n", "same\n1 2\n"),
            Verdict::PresentationError
        );
    }
}
