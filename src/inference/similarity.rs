//! String similarity for the fuzzy fallback
//!
//! Ratcliff/Obershelp "gestalt" matching: find the longest common block,
//! recurse on both sides of it, and score `2 * matched / (len(a) + len(b))`.
//! Ties between equally long blocks resolve to the earliest position in `a`,
//! then in `b`, so scores are deterministic.

use std::collections::HashMap;

/// Similarity ratio in `0.0..=1.0`; `1.0` means identical strings.
///
/// Two empty strings are identical.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matched_chars(&a, &b) as f64 / total as f64
}

/// Total length of all matching blocks between `a` and `b`.
fn matched_chars(a: &[char], b: &[char]) -> usize {
    let mut b_index: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, c) in b.iter().enumerate() {
        b_index.entry(*c).or_default().push(j);
    }

    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, size) = longest_match(a, &b_index, alo, ahi, blo, bhi);
        if size == 0 {
            continue;
        }
        matched += size;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            pending.push((i + size, ahi, j + size, bhi));
        }
    }
    matched
}

/// Longest block `a[i..i+size] == b[j..j+size]` inside the given bounds.
fn longest_match(
    a: &[char],
    b_index: &HashMap<char, Vec<usize>>,
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
    // run length of the match ending at b[j], for the previous row of a
    let mut run_ending_at: HashMap<usize, usize> = HashMap::new();

    for (i, c) in a.iter().enumerate().take(ahi).skip(alo) {
        let mut next_runs = HashMap::new();
        if let Some(positions) = b_index.get(c) {
            for &j in positions {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }
                let run = if j > 0 {
                    run_ending_at.get(&(j - 1)).copied().unwrap_or(0)
                } else {
                    0
                } + 1;
                next_runs.insert(j, run);
                if run > best_size {
                    best_i = i + 1 - run;
                    best_j = j + 1 - run;
                    best_size = run;
                }
            }
        }
        run_ending_at = next_runs;
    }

    (best_i, best_j, best_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_and_disjoint() {
        assert_eq!(ratio("react js", "react js"), 1.0);
        assert_eq!(ratio("", ""), 1.0);
        assert_eq!(ratio("abc", "xyz"), 0.0);
        assert_eq!(ratio("abc", ""), 0.0);
    }

    #[test]
    fn test_known_ratios() {
        // single block "bcd"
        assert!((ratio("abcd", "bcde") - 0.75).abs() < 1e-12);
        // one substitution in a four-letter word
        assert!((ratio("linux", "linex") - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_ratio_counts_blocks_on_both_sides() {
        // "abc" matches first, then "xyz" on the right side of it
        let score = ratio("abc123xyz", "abcxyz");
        assert!((score - 12.0 / 15.0).abs() < 1e-12);
    }

    #[test]
    fn test_ratio_is_symmetric_for_simple_inputs() {
        let pairs = [("python i", "python ii"), ("flutter", "fluter"), ("banco", "banco de dados")];
        for (a, b) in pairs {
            assert!((ratio(a, b) - ratio(b, a)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_non_ascii_is_char_based() {
        assert_eq!(ratio("ação", "ação"), 1.0);
        assert!((ratio("ação", "acao") - 0.5).abs() < 1e-12);
    }
}
