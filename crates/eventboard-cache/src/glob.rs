//! Redis-compatible glob matching.
//!
//! Supports the subset of `KEYS`/`SCAN MATCH` syntax the cache relies on:
//! `*`, `?`, `[abc]`, `[a-z]`, `[^a]` and `\` escapes. The in-memory store
//! uses this so that invalidation patterns behave identically on both
//! backends.

/// Characters with special meaning in a glob pattern.
const SPECIAL: [char; 5] = ['*', '?', '[', ']', '\\'];

/// Escapes `literal` so it matches only itself.
pub fn escape(literal: &str) -> String {
    let mut escaped = String::with_capacity(literal.len());
    for c in literal.chars() {
        if SPECIAL.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Pattern matching every key that starts with `literal_prefix`.
pub fn prefix_pattern(literal_prefix: &str) -> String {
    format!("{}*", escape(literal_prefix))
}

pub fn glob_match(pattern: &str, key: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let key: Vec<char> = key.chars().collect();
    match_from(&pattern, &key)
}

fn match_from(pattern: &[char], key: &[char]) -> bool {
    let (mut p, mut k) = (0, 0);
    // Position to resume from after the most recent `*`.
    let mut backtrack: Option<(usize, usize)> = None;

    while k < key.len() {
        let step = match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p + 1, k));
                p += 1;
                continue;
            }
            Some('?') => Some(1),
            Some('[') => match_class(&pattern[p..], key[k]),
            Some('\\') if p + 1 < pattern.len() => (pattern[p + 1] == key[k]).then_some(2),
            Some(&c) => (c == key[k]).then_some(1),
            None => None,
        };

        match step {
            Some(consumed) => {
                p += consumed;
                k += 1;
            }
            None => match backtrack {
                Some((star_p, star_k)) => {
                    p = star_p;
                    k = star_k + 1;
                    backtrack = Some((star_p, star_k + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

/// Matches a `[...]` class at the start of `pattern` against `c`. Returns the
/// pattern length consumed on success.
fn match_class(pattern: &[char], c: char) -> Option<usize> {
    let mut i = 1;
    let negate = pattern.get(i) == Some(&'^');
    if negate {
        i += 1;
    }

    let mut matched = false;
    loop {
        match pattern.get(i) {
            // Unterminated class: Redis treats the rest as the class body.
            None => break,
            Some(']') => {
                i += 1;
                break;
            }
            Some('\\') if i + 1 < pattern.len() => {
                matched |= pattern[i + 1] == c;
                i += 2;
            }
            Some(&start) if pattern.get(i + 1) == Some(&'-') && i + 2 < pattern.len() => {
                let end = pattern[i + 2];
                let (lo, hi) = if start <= end { (start, end) } else { (end, start) };
                matched |= lo <= c && c <= hi;
                i += 3;
            }
            Some(&literal) => {
                matched |= literal == c;
                i += 1;
            }
        }
    }

    (matched != negate).then_some(i)
}
