//! Token-sort string similarity for counterparty names

/// Lowercase, turn punctuation into spaces, then sort the words.
///
/// "Co., Acme" and "acme co" both become "acme co".
pub fn token_sort_key(value: &str) -> String {
    let cleaned: String = value
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .flat_map(char::to_lowercase)
        .collect();
    let mut tokens: Vec<&str> = cleaned.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Length of the longest common subsequence of two character sequences
fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut previous = vec![0usize; b.len() + 1];
    let mut current = vec![0usize; b.len() + 1];
    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            current[j + 1] = if ca == cb {
                previous[j] + 1
            } else {
                current[j].max(previous[j + 1])
            };
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

/// Normalized Indel similarity, `2 * LCS / (|a| + |b|)`, in `0.0..=1.0`
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 0.0;
    }
    (2 * lcs_len(&a, &b)) as f64 / total as f64
}

/// Similarity of two names regardless of word order, case and punctuation.
/// Blank inputs score zero.
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    let (a, b) = (token_sort_key(a), token_sort_key(b));
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    ratio(&a, &b)
}
