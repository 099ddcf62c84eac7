//! Token-set similarity scoring.
//!
//! Headers and labels are split into lower-case word tokens (on separators and
//! camelCase boundaries), stopwords dropped, and compared as sets:
//!
//! ```text
//! sect   = sorted(a ∩ b)
//! a_full = sect + sorted(a - b)
//! b_full = sect + sorted(b - a)
//! score  = max(sim(sect, a_full), sim(sect, b_full), sim(a_full, b_full))
//! ```
//!
//! where `sim` is the normalized Indel similarity. A non-empty intersection
//! that covers either side scores 1.0.

use std::collections::BTreeSet;

use rapidfuzz::distance::indel;

/// Split text into a set of lower-case word tokens.
pub fn token_set(raw: &str) -> BTreeSet<String> {
    let mut spaced = String::with_capacity(raw.len() + 4);
    let mut prev_lower = false;
    for ch in raw.chars() {
        if ch.is_alphanumeric() {
            if prev_lower && ch.is_uppercase() {
                spaced.push(' ');
            }
            spaced.push(ch);
            prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        } else {
            spaced.push(' ');
            prev_lower = false;
        }
    }
    spaced
        .split_whitespace()
        .map(str::to_lowercase)
        .filter(|token| !is_stopword(token))
        .collect()
}

fn is_stopword(token: &str) -> bool {
    matches!(
        token,
        "of" | "and"
            | "the"
            | "to"
            | "for"
            | "in"
            | "on"
            | "at"
            | "with"
            | "by"
            | "from"
            | "or"
            | "a"
            | "an"
    )
}

fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    indel::normalized_similarity(a.chars(), b.chars())
}

fn join(parts: &[&String]) -> String {
    parts
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Token-set ratio on a 0.0–1.0 scale.
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let left = token_set(a);
    let right = token_set(b);
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    let sect: Vec<&String> = left.intersection(&right).collect();
    let diff_ab: Vec<&String> = left.difference(&right).collect();
    let diff_ba: Vec<&String> = right.difference(&left).collect();
    if !sect.is_empty() && (diff_ab.is_empty() || diff_ba.is_empty()) {
        return 1.0;
    }

    let sect_text = join(&sect);
    let with_diff = |diff: &[&String]| {
        let diff_text = join(diff);
        if sect_text.is_empty() {
            diff_text
        } else {
            format!("{sect_text} {diff_text}")
        }
    };
    let left_full = with_diff(&diff_ab);
    let right_full = with_diff(&diff_ba);

    let mut best = similarity(&left_full, &right_full);
    if !sect_text.is_empty() {
        best = best
            .max(similarity(&sect_text, &left_full))
            .max(similarity(&sect_text, &right_full));
    }
    best.clamp(0.0, 1.0)
}
