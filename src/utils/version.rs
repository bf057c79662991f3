use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A release version in strict `major.minor.patch` form.
///
/// The dotted text is kept exactly as given (minus an optional single leading
/// `v`) so that it round-trips; numeric components back the ordering. Any run
/// of digits is accepted, however long.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeVersion {
    text: String,
    semver: semver::Version,
    prefixed: bool,
}

impl NodeVersion {
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let invalid = || Error::InvalidFormat(raw.to_string());

        let (body, prefixed) = match raw.strip_prefix('v') {
            Some(rest) => (rest, true),
            None => (raw, false),
        };

        let parts: Vec<&str> = body.split('.').collect();
        if parts.len() != 3 {
            return Err(invalid());
        }

        let mut numbers = [0u64; 3];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            // Saturates; `cmp` falls back to the digits when both sides overflow.
            *slot = part.parse().unwrap_or(u64::MAX);
        }

        Ok(Self {
            text: body.to_string(),
            semver: semver::Version::new(numbers[0], numbers[1], numbers[2]),
            prefixed,
        })
    }

    /// Canonical `v`-prefixed form used in URLs and directory names.
    pub fn tag(&self) -> String {
        format!("v{}", self.text)
    }

    /// Whether the raw input carried the leading `v`.
    pub fn was_prefixed(&self) -> bool {
        self.prefixed
    }
}

impl fmt::Display for NodeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl FromStr for NodeVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Ord for NodeVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.semver
            .cmp(&other.semver)
            .then_with(|| numeric_key(&self.text).cmp(numeric_key(&other.text)))
            .then_with(|| self.text.cmp(&other.text))
            .then_with(|| self.prefixed.cmp(&other.prefixed))
    }
}

impl PartialOrd for NodeVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Orders digit runs of any length by value: fewer significant digits first,
/// then lexically.
fn numeric_key(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.split('.').map(|part| {
        let digits = part.trim_start_matches('0');
        (digits.len(), digits)
    })
}
