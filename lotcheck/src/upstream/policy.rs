//! Detection of upstream rate-limit responses.
//!
//! The upstream reports throttling only through free-text descriptions, so
//! detection is a case-insensitive substring match against an adjustable
//! phrase list (configured under `[retry] rate_limit_patterns`).

/// Phrases the upstream uses when its rate limit is exceeded.
pub const DEFAULT_RATE_LIMIT_PATTERNS: &[&str] = &[
    "limite de requisições",
    "máximo de 1 por segundo",
    "limite de consultas excedido",
];

/// Case-insensitive phrase matcher for throttling descriptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Lowercased patterns.
    patterns: Vec<String>,
}

impl RateLimitPolicy {
    /// Creates a policy from the given phrases. Blank phrases are ignored.
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| p.as_ref().trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        Self { patterns }
    }

    /// Returns true if `description` contains any configured phrase.
    pub fn is_throttled(&self, description: &str) -> bool {
        let haystack = description.to_lowercase();
        self.patterns.iter().any(|p| haystack.contains(p.as_str()))
    }

    /// The normalized phrase list.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RATE_LIMIT_PATTERNS)
    }
}
