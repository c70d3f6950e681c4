//! "Did you mean" suggestions for misspelled names.

const MAX_DISTANCE: usize = 3;

/// Returns the single closest candidate to `given`, if it is within a small
/// edit distance and no other candidate is equally close.
pub fn closest_match<'a, I>(given: &str, candidates: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(&str, usize)> = None;
    let mut tied = false;
    for candidate in candidates {
        if candidate == given {
            continue;
        }
        let dist = levenshtein(given, candidate);
        if dist >= MAX_DISTANCE {
            continue;
        }
        match best {
            Some((_, d)) if dist > d => {}
            Some((b, d)) if dist == d => {
                if b != candidate {
                    tied = true;
                }
            }
            _ => {
                best = Some((candidate, dist));
                tied = false;
            }
        }
    }
    if tied {
        return None;
    }
    best.map(|(s, _)| s.to_string())
}

/// Renders a suggestion as a sentence to append to a diagnostic detail, or
/// an empty string when there is nothing to suggest.
pub fn did_you_mean<'a, I>(given: &str, candidates: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    match closest_match(given, candidates) {
        Some(name) => format!(" Did you mean {:?}?", name),
        None => String::new(),
    }
}

pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (m, n) = (a.len(), b.len());
    let mut dp = vec![vec![0usize; n + 1]; m + 1];
    for (i, row) in dp.iter_mut().enumerate() {
        row[0] = i;
    }
    for (j, val) in dp[0].iter_mut().enumerate() {
        *val = j;
    }
    for i in 1..=m {
        for j in 1..=n {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            dp[i][j] = (dp[i - 1][j] + 1)
                .min(dp[i][j - 1] + 1)
                .min(dp[i - 1][j - 1] + cost);
        }
    }
    dp[m][n]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("nome", "name"), 1);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
    }

    #[test]
    fn test_suggests_close_name() {
        assert_eq!(
            did_you_mean("nome", ["name", "value"]),
            " Did you mean \"name\"?"
        );
    }

    #[test]
    fn test_no_suggestion_when_far() {
        assert_eq!(did_you_mean("xyz", ["name"]), "");
    }

    #[test]
    fn test_no_suggestion_when_ambiguous() {
        assert_eq!(closest_match("bat", ["cat", "hat"]), None);
    }
}
