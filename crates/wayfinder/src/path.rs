//! URL paths and the path patterns linking configs are written in.

use std::{cmp::Ordering, collections::BTreeMap, fmt, str::FromStr};

use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use regex::Regex;

use crate::error::{self, PatternError, Result};

/// Characters escaped in path segments and query components.
const COMPONENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'/')
    .add(b'<')
    .add(b'=')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Percent-encode a path segment or query component.
pub fn encode(s: &str) -> String {
    utf8_percent_encode(s, COMPONENT).to_string()
}

/// Decode a percent-encoded path segment or query component.
pub fn decode(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

/// A URL path, stored as its raw (still encoded) segments. Empty segments
/// are dropped, so `/a//b/` and `a/b` are the same path.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Path {
    /// Stored path segments.
    segments: Vec<String>,
}

impl FromStr for Path {
    type Err = error::Error;
    fn from_str(s: &str) -> Result<Self> {
        Ok(Self::from(s))
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.segments.join("/"))
    }
}

impl Path {
    /// Construct an empty path.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Construct a path from decoded segments, encoding each one.
    pub fn new<I>(v: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        Self {
            segments: v
                .into_iter()
                .filter(|x| !x.as_ref().is_empty())
                .map(|x| encode(x.as_ref()))
                .collect(),
        }
    }

    /// Raw segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Decoded segments.
    pub fn decoded(&self) -> Vec<String> {
        self.segments.iter().map(|s| decode(s)).collect()
    }

    /// Is this the root path?
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The text patterns are matched against: empty for the root path,
    /// otherwise every segment preceded by a slash.
    fn haystack(&self) -> String {
        self.segments.iter().map(|s| format!("/{s}")).collect()
    }
}

impl From<&str> for Path {
    fn from(v: &str) -> Self {
        Self {
            segments: v
                .split('/')
                .filter(|x| !x.is_empty())
                .map(ToString::to_string)
                .collect(),
        }
    }
}

/// One segment of a path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Matches itself.
    Literal(String),
    /// `:name`, captures one segment.
    Param(String),
    /// `:name?`, captures one segment if present.
    OptionalParam(String),
    /// `*`, matches the rest of the path.
    Wildcard,
}

impl Segment {
    /// Matching precedence: lower ranks are tried first.
    fn rank(&self) -> u8 {
        match self {
            Self::Literal(_) => 0,
            Self::Param(_) => 1,
            Self::OptionalParam(_) => 2,
            Self::Wildcard => 3,
        }
    }

    /// The captured parameter name, if any.
    pub fn param(&self) -> Option<&str> {
        match self {
            Self::Param(n) | Self::OptionalParam(n) => Some(n),
            Self::Literal(_) | Self::Wildcard => None,
        }
    }

    /// Does this segment always consume a path segment?
    fn is_required(&self) -> bool {
        matches!(self, Self::Literal(_) | Self::Param(_))
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(s) => write!(f, "{s}"),
            Self::Param(n) => write!(f, ":{n}"),
            Self::OptionalParam(n) => write!(f, ":{n}?"),
            Self::Wildcard => write!(f, "*"),
        }
    }
}

/// A compiled path pattern such as `user/:id/posts/:tab?` or `*`.
#[derive(Debug, Clone)]
pub struct PathPattern {
    /// Parsed segments.
    segments: Vec<Segment>,
    /// Anchored expression over [`Path::haystack`].
    expr: Regex,
}

impl PartialEq for PathPattern {
    fn eq(&self, other: &Self) -> bool {
        self.segments == other.segments
    }
}

impl Eq for PathPattern {}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.segments.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join("/"))
    }
}

/// Is this a usable parameter name?
fn valid_param(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl PathPattern {
    /// Compile a pattern string. Leading, trailing and repeated slashes are
    /// ignored.
    pub fn new(pattern: &str) -> Result<Self> {
        let mut segments = Vec::new();
        for part in pattern.split('/').filter(|p| !p.is_empty()) {
            let seg = if part == "*" {
                Segment::Wildcard
            } else if let Some(name) = part.strip_prefix(':') {
                match name.strip_suffix('?') {
                    Some(n) => Segment::OptionalParam(n.to_string()),
                    None => Segment::Param(name.to_string()),
                }
            } else {
                Segment::Literal(part.to_string())
            };
            if let Some(name) = seg.param()
                && !valid_param(name)
            {
                return Err(PatternError::new(pattern, format!("invalid parameter {part:?}")).into());
            }
            segments.push(seg);
        }
        Self::from_segments(pattern, segments)
    }

    /// Validate segments and compile the expression.
    fn from_segments(source: &str, segments: Vec<Segment>) -> Result<Self> {
        if let Some(pos) = segments.iter().position(|s| *s == Segment::Wildcard)
            && pos + 1 != segments.len()
        {
            return Err(PatternError::new(source, "wildcard must be the last segment").into());
        }
        let mut seen = Vec::new();
        for name in segments.iter().filter_map(Segment::param) {
            if seen.contains(&name) {
                return Err(
                    PatternError::new(source, format!("parameter :{name} appears twice")).into(),
                );
            }
            seen.push(name);
        }
        let body: String = segments
            .iter()
            .map(|s| match s {
                Segment::Literal(l) => format!("/{}", regex::escape(&encode(l))),
                Segment::Param(_) => String::from("/([^/]+)"),
                Segment::OptionalParam(_) => String::from("(?:/([^/]+))?"),
                Segment::Wildcard => String::from("(?:/.*)?"),
            })
            .collect();
        let expr = Regex::new(&format!("^{body}$"))?;
        Ok(Self { segments, expr })
    }

    /// The pattern `self` followed by `other`.
    pub fn join(&self, other: &Self) -> Result<Self> {
        let segments: Vec<Segment> = self
            .segments
            .iter()
            .chain(other.segments.iter())
            .cloned()
            .collect();
        Self::from_segments(&format!("{self}/{other}"), segments)
    }

    /// Parsed segments.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Parameter names, in order.
    pub fn params(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(Segment::param)
    }

    /// Does the pattern match the root path only?
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Match a path, returning the decoded value of every captured
    /// parameter. Optional parameters that are absent are left out.
    pub fn captures(&self, path: &Path) -> Option<BTreeMap<String, String>> {
        let haystack = path.haystack();
        let caps = self.expr.captures(&haystack)?;
        Some(
            self.params()
                .enumerate()
                .filter_map(|(i, name)| caps.get(i + 1).map(|m| (name.to_string(), decode(m.as_str()))))
                .collect(),
        )
    }

    /// Order patterns by how specifically they match. Patterns that sort
    /// first are tried first: position by position, literals beat params,
    /// params beat optional params and wildcards come last. Between a
    /// pattern and its extension the one with more required segments wins,
    /// then the shorter one.
    pub fn cmp_specificity(&self, other: &Self) -> Ordering {
        for (a, b) in self.segments.iter().zip(other.segments.iter()) {
            match a.rank().cmp(&b.rank()) {
                Ordering::Equal => {}
                o => return o,
            }
        }
        let required = |p: &Self| p.segments.iter().filter(|s| s.is_required()).count();
        required(other)
            .cmp(&required(self))
            .then_with(|| self.segments.len().cmp(&other.segments.len()))
    }
}
