//! Path-template compilation and matching.
//!
//! Each API's path templates are compiled once at snapshot-build time into
//! regex patterns with a deterministic specificity score; per-request
//! matching only tests pre-compiled patterns.
//!
//! # Template syntax
//!
//! - `{name}` captures exactly one path segment (no slash).
//! - `{+name}` as the **final** segment absorbs the remainder of the path
//!   (greedy, may span slashes).  Anywhere else it degrades to a
//!   single-segment capture.
//! - The literal root template `/` matches the base path with an optional
//!   trailing slash.
//!
//! The compiled pattern is `^` + base path (trailing slash stripped) +
//! translated template + `/?$`.
//!
//! # Specificity scoring
//!
//! The score is the sum of squared distance-from-end over placeholder
//! positions: a placeholder at segment index `i` of an `N`-segment template
//! contributes `(N - i)²`.  Earlier placeholders therefore weigh more, zero
//! placeholders score 0, and a **lower** score is **more** specific.

use regex::Regex;

/// A pre-compiled match entry for one (API, path template) pair.
#[derive(Debug, Clone)]
pub struct MatchEntry {
    /// Index of the owning API document in its snapshot (insertion order).
    pub api_index: usize,
    /// The original path template, e.g. `/quote/{symbol}`.
    pub template: String,
    /// Specificity score — lower is more specific.
    pub score: u32,
    /// Uppercase methods this entry's operations accept.
    pub methods: Vec<String>,
    pattern: Regex,
}

impl MatchEntry {
    /// Compile `base_path` + `template` into a match entry.
    pub fn compile(
        api_index: usize,
        base_path: &str,
        template: &str,
        methods: Vec<String>,
    ) -> Result<Self, regex::Error> {
        let (pattern, score) = compile(base_path, template)?;
        Ok(Self {
            api_index,
            template: template.to_string(),
            score,
            methods: methods.into_iter().map(|m| m.to_uppercase()).collect(),
            pattern,
        })
    }

    fn accepts(&self, method: &str) -> bool {
        let wanted = method.to_uppercase();
        self.methods.iter().any(|m| *m == wanted)
    }

    fn matches(&self, path: &str) -> bool {
        self.pattern.is_match(path)
    }
}

/// Compile a base path + template into `(pattern, score)`.
pub fn compile(base_path: &str, template: &str) -> Result<(Regex, u32), regex::Error> {
    let base = base_path.trim_end_matches('/');
    let segments: Vec<&str> = template.split('/').filter(|s| !s.is_empty()).collect();

    let mut translated = String::new();
    let last = segments.len().saturating_sub(1);
    for (i, seg) in segments.iter().enumerate() {
        translated.push('/');
        if seg.starts_with("{+") && seg.ends_with('}') && i == last {
            // Multi-segment placeholder: greedy, only honoured in final
            // position.
            translated.push_str("(.+)");
        } else if seg.starts_with('{') && seg.ends_with('}') {
            translated.push_str("([^/]+)");
        } else {
            translated.push_str(&regex::escape(seg));
        }
    }

    let pattern = format!("^{}{}/?$", regex::escape(base), translated);
    Ok((Regex::new(&pattern)?, score(template)))
}

/// Specificity score of a template: `Σ (N - i)²` over placeholder segment
/// indices `i`, where `N` is the segment count.
pub fn score(template: &str) -> u32 {
    let segments: Vec<&str> = template.split('/').filter(|s| !s.is_empty()).collect();
    let n = segments.len() as u32;
    segments
        .iter()
        .enumerate()
        .filter(|(_, seg)| seg.starts_with('{') && seg.ends_with('}'))
        .map(|(i, _)| (n - i as u32).pow(2))
        .sum()
}

/// Match `(method, path)` against a set of compiled entries.
///
/// Among entries of the same API document only the lowest-score match is
/// kept (more specific wins); the per-document winners are then returned
/// sorted by **descending** score, ties preserving entry insertion order.
/// An empty result is the normal "no API matched" outcome, not an error.
pub fn match_entries<'a>(entries: &'a [MatchEntry], method: &str, path: &str) -> Vec<&'a MatchEntry> {
    let mut best: Vec<&'a MatchEntry> = Vec::new();
    for entry in entries {
        if !entry.accepts(method) || !entry.matches(path) {
            continue;
        }
        match best.iter_mut().find(|b| b.api_index == entry.api_index) {
            Some(slot) => {
                if entry.score < slot.score {
                    *slot = entry;
                }
            }
            None => best.push(entry),
        }
    }
    // Stable sort keeps insertion order for equal scores.
    best.sort_by(|a, b| b.score.cmp(&a.score));
    best
}

// =============================================================================
// Tests
// =============================================================================
