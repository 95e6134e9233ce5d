//! Ant-style path matching
//!
//! - `?` matches exactly one character within a segment
//! - `*` matches zero or more characters within a segment
//! - `**` matches zero or more whole segments
//!
//! A trailing slash is ignored on both pattern and path. Matching is
//! case sensitive.

/// Compiled Ant-style path pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AntMatcher {
    pattern: String,
    segments: Vec<String>,
}

impl AntMatcher {
    /// Compile a pattern
    ///
    /// Returns an error message if the pattern is empty or not absolute.
    pub fn new(pattern: &str) -> Result<Self, String> {
        let trimmed = pattern.trim();
        if trimmed.is_empty() {
            return Err("path pattern must not be empty".to_string());
        }
        if !trimmed.starts_with('/') {
            return Err(format!("path pattern must start with '/': {}", trimmed));
        }

        Ok(Self {
            pattern: trimmed.to_string(),
            segments: split_segments(trimmed)
                .into_iter()
                .map(str::to_string)
                .collect(),
        })
    }

    /// Source pattern
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Check whether a request path matches this pattern
    pub fn matches(&self, path: &str) -> bool {
        let path_segments = split_segments(path);
        let pattern_segments: Vec<&str> = self.segments.iter().map(String::as_str).collect();
        match_segments(&pattern_segments, &path_segments)
    }
}

fn split_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn match_segments(pattern: &[&str], path: &[&str]) -> bool {
    match pattern.split_first() {
        None => path.is_empty(),
        Some((&"**", rest)) => (0..=path.len()).any(|skip| match_segments(rest, &path[skip..])),
        Some((segment, rest)) => match path.split_first() {
            Some((candidate, path_rest)) => {
                match_segment(segment, candidate) && match_segments(rest, path_rest)
            }
            None => false,
        },
    }
}

fn match_segment(pattern: &str, candidate: &str) -> bool {
    if !pattern.contains(['*', '?']) {
        return pattern == candidate;
    }

    let p: Vec<char> = pattern.chars().collect();
    let c: Vec<char> = candidate.chars().collect();

    // Iterative wildcard match with single-star backtracking
    let (mut pi, mut ci) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None;

    while ci < c.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == c[ci]) {
            pi += 1;
            ci += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ci));
            pi += 1;
        } else if let Some((star_pi, star_ci)) = star {
            pi = star_pi + 1;
            ci = star_ci + 1;
            star = Some((star_pi, star_ci + 1));
        } else {
            return false;
        }
    }

    p[pi..].iter().all(|&ch| ch == '*')
}
