//! Version specifiers and npm-style range matching.
//!
//! npm ranges (`>=1.2.0 <2`, `1.x || 2.1.3`, `1.0.0 - 1.4`) are translated
//! into [`semver::VersionReq`] comparator sets, one requirement per `||`
//! alternative. A range matches a version when any alternative does.

use semver::{Version, VersionReq};
use std::fmt;

/// The sentinel specifier that resolves through the registry.
pub const LATEST: &str = "latest";

/// A version specifier supplied by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum VersionSpec {
    /// Resolve to the version currently published under the `latest` dist-tag.
    Latest,
    /// A syntactically valid npm range.
    Range(NpmRange),
}

impl VersionSpec {
    /// Parse a specifier. Returns `None` if it is neither `latest` nor a valid range.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw == LATEST {
            return Some(VersionSpec::Latest);
        }
        NpmRange::parse(raw).map(VersionSpec::Range)
    }
}

/// A parsed npm semantic-version range.
#[derive(Debug, Clone, PartialEq)]
pub struct NpmRange {
    raw: String,
    alternatives: Vec<VersionReq>,
}

impl NpmRange {
    /// Parse an npm range. Returns `None` if the range is malformed.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let alternatives = raw
            .split("||")
            .map(translate_set)
            .collect::<Option<Vec<_>>>()?
            .iter()
            .map(|req| VersionReq::parse(req).ok())
            .collect::<Option<Vec<_>>>()?;

        Some(Self {
            raw: raw.to_string(),
            alternatives,
        })
    }

    /// The range as written (trimmed).
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives.iter().any(|req| req.matches(version))
    }

    /// Intersect this range with a single installed version.
    ///
    /// Returns the installed version in canonical form if it lies in the range.
    /// Versions that do not parse never intersect.
    pub fn intersect(&self, installed: &str) -> Option<String> {
        let version = parse_version(installed)?;
        self.matches(&version).then(|| version.to_string())
    }
}

impl fmt::Display for NpmRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Parse a concrete version, tolerating a leading `v` or `=` as npm does.
pub fn parse_version(raw: &str) -> Option<Version> {
    let trimmed = raw.trim().trim_start_matches('=').trim_start();
    let trimmed = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);
    Version::parse(trimmed).ok()
}

// `~>` must precede `~` so the longer operator wins the prefix match
const OPERATORS: [&str; 8] = [">=", "<=", ">", "<", "=", "^", "~>", "~"];

/// A translated comparator that admits every version.
const ANY: &str = "*";

/// Translate one whitespace-separated comparator set into a comma-separated
/// `VersionReq` string.
fn translate_set(set: &str) -> Option<String> {
    let mut tokens: Vec<String> = Vec::new();
    let mut pending_op: Option<&str> = None;
    for token in set.split_whitespace() {
        if let Some(op) = OPERATORS.iter().find(|op| **op == token) {
            if pending_op.is_some() {
                return None;
            }
            pending_op = Some(*op);
            continue;
        }
        match pending_op.take() {
            Some(op) => tokens.push(format!("{}{}", op, token)),
            None => tokens.push(token.to_string()),
        }
    }
    if pending_op.is_some() {
        return None;
    }

    if tokens.is_empty() {
        return Some(ANY.to_string());
    }

    let comparators = if tokens.len() == 3 && tokens[1] == "-" {
        vec![
            translate_comparator(&format!(">={}", tokens[0]))?,
            translate_comparator(&format!("<={}", tokens[2]))?,
        ]
    } else {
        tokens
            .iter()
            .map(|token| translate_comparator(token))
            .collect::<Option<Vec<_>>>()?
    };

    // `semver` only accepts `*` as the sole comparator of a set
    let narrowing: Vec<String> = comparators.into_iter().filter(|c| c.as_str() != ANY).collect();
    if narrowing.is_empty() {
        return Some(ANY.to_string());
    }
    Some(narrowing.join(", "))
}

fn translate_comparator(token: &str) -> Option<String> {
    let op = OPERATORS
        .iter()
        .find(|op| token.starts_with(**op))
        .copied()
        .unwrap_or("");
    let version = &token[op.len()..];
    let op = if op == "~>" { "~" } else { op };
    let version = version
        .strip_prefix('v')
        .or_else(|| version.strip_prefix('V'))
        .unwrap_or(version);

    let (core, suffix) = match version.find(['-', '+']) {
        Some(i) => version.split_at(i),
        None => (version, ""),
    };

    let mut numeric = Vec::new();
    let mut wildcard = false;
    for part in core.split('.') {
        if matches!(part, "x" | "X" | "*") {
            wildcard = true;
            break;
        }
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        numeric.push(part);
    }
    if numeric.len() > 3 {
        return None;
    }
    let partial = wildcard || numeric.len() < 3;

    if numeric.is_empty() {
        return match op {
            ">" | "<" => Some("<0.0.0-0".to_string()),
            _ => Some(ANY.to_string()),
        };
    }

    let joined = numeric.join(".");
    if op.is_empty() {
        // A bare version is exact in npm; a bare partial is an x-range
        return Some(if partial {
            format!("{}.*", joined)
        } else {
            format!("={}{}", joined, suffix)
        });
    }

    if partial {
        Some(format!("{}{}", op, joined))
    } else {
        Some(format!("{}{}{}", op, joined, suffix))
    }
}
