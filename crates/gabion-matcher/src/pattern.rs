/// A compiled path template. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchPattern {
    segments: Vec<Segment>,
}

/// A single segment matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// Matches the segment text exactly (case-sensitive).
    Literal(String),
    /// Matches any single non-empty segment.
    Wildcard,
}

impl MatchPattern {
    /// Compile a path template into a pattern.
    ///
    /// Each `{identifier}` segment becomes a wildcard; everything else is
    /// matched literally. An empty template matches only the empty path.
    pub fn compile(template: &str) -> Self {
        let segments = split_segments(template)
            .map(|seg| {
                if is_param_segment(seg) {
                    Segment::Wildcard
                } else {
                    Segment::Literal(seg.to_string())
                }
            })
            .collect();
        Self { segments }
    }

    /// Test a concrete path against this pattern.
    ///
    /// Succeeds iff the candidate has the same number of segments, every
    /// literal segment matches exactly, and every wildcard segment is
    /// non-empty. Trailing slashes are insignificant on both sides.
    pub fn matches(&self, candidate: &str) -> bool {
        let mut parts = split_segments(candidate);
        let mut segments = self.segments.iter();

        loop {
            match (segments.next(), parts.next()) {
                (Some(Segment::Literal(lit)), Some(part)) if lit == part => {}
                (Some(Segment::Wildcard), Some(part)) if !part.is_empty() => {}
                (None, None) => return true,
                _ => return false,
            }
        }
    }

    /// Number of segments in the pattern.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// True if a segment is a `{identifier}` template parameter.
fn is_param_segment(segment: &str) -> bool {
    segment.len() > 2 && segment.starts_with('{') && segment.ends_with('}')
}

/// Split a path into segments, ignoring a single trailing slash.
fn split_segments(path: &str) -> std::str::Split<'_, char> {
    let trimmed = match path.strip_suffix('/') {
        Some(rest) if !rest.is_empty() => rest,
        _ => path,
    };
    trimmed.split('/')
}
