use std::cmp::Ordering;
use std::iter::Peekable;
use std::str::Chars;

/// Case-insensitive, numeric-aware comparison ("2 Intro" sorts before "10 Wrapup").
///
/// Runs of ASCII digits compare by numeric value, everything else compares
/// by lowercased character. Names that are equal under those rules fall back
/// to a plain byte comparison so the resulting order is total.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();

    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {
                let l_digits = take_digits(&mut left);
                let r_digits = take_digits(&mut right);
                let ord = compare_digit_runs(&l_digits, &r_digits);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(l), Some(r)) => {
                let ord = l.to_lowercase().cmp(r.to_lowercase());
                if ord != Ordering::Equal {
                    return ord;
                }
                left.next();
                right.next();
            }
        }
    }
}

fn take_digits(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(ch) = chars.peek().copied() {
        if !ch.is_ascii_digit() {
            break;
        }
        digits.push(ch);
        chars.next();
    }
    digits
}

// Arbitrary-length runs: compare without parsing so "000123456789012345678901" can't overflow.
fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(mut names: Vec<&str>) -> Vec<&str> {
        names.sort_by(|a, b| natural_cmp(a, b));
        names
    }

    #[test]
    fn numbers_compare_by_value() {
        assert_eq!(
            sorted(vec!["2 Intro.mp4", "10 Wrapup.mp4", "1 Start.mp4"]),
            vec!["1 Start.mp4", "2 Intro.mp4", "10 Wrapup.mp4"]
        );
    }

    #[test]
    fn letters_ignore_case() {
        assert_eq!(sorted(vec!["beta", "Alpha", "gamma"]), vec!["Alpha", "beta", "gamma"]);
    }

    #[test]
    fn leading_zeros_do_not_change_order() {
        assert_eq!(natural_cmp("01 a", "1 b"), Ordering::Less);
        assert_eq!(natural_cmp("002", "10"), Ordering::Less);
    }

    #[test]
    fn prefix_sorts_first() {
        assert_eq!(natural_cmp("Lesson", "Lesson 2"), Ordering::Less);
    }

    #[test]
    fn multiple_numeric_groups() {
        assert_eq!(
            sorted(vec!["Part 1 - 10", "Part 1 - 2", "Part 10 - 1"]),
            vec!["Part 1 - 2", "Part 1 - 10", "Part 10 - 1"]
        );
    }

    #[test]
    fn case_only_difference_is_still_total() {
        assert_ne!(natural_cmp("Intro", "intro"), Ordering::Equal);
        assert_eq!(natural_cmp("Intro", "Intro"), Ordering::Equal);
    }

    #[test]
    fn very_long_digit_runs() {
        assert_eq!(
            natural_cmp("99999999999999999999999", "100000000000000000000000"),
            Ordering::Less
        );
    }
}
