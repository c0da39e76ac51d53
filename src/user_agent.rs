//! Browser User-Agent strings and per-request rotation.

use rand::seq::SliceRandom;

/// Realistic browser User-Agent strings.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.6 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_6 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.6 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36 Edg/131.0.0.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36 OPR/115.0.0.0",
];

/// Picks the User-Agent header for each outgoing request.
#[derive(Debug, Clone)]
pub enum UserAgentPolicy {
    /// Random entry from the built-in list on every request.
    Rotate,
    /// Always the same string.
    Fixed(String),
}

impl UserAgentPolicy {
    /// Returns the User-Agent to use for the next request.
    pub fn next(&self) -> &str {
        match self {
            Self::Rotate => random_user_agent(),
            Self::Fixed(ua) => ua,
        }
    }
}

impl Default for UserAgentPolicy {
    fn default() -> Self {
        Self::Rotate
    }
}

/// Selects a random User-Agent string from the built-in list.
pub fn random_user_agent() -> &'static str {
    let mut rng = rand::thread_rng();
    USER_AGENTS.choose(&mut rng).copied().unwrap_or(USER_AGENTS[0])
}

/// Returns the built-in User-Agent list.
pub fn user_agents() -> &'static [&'static str] {
    USER_AGENTS
}
