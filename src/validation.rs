//! Per-placeholder-kind validation and normalisation of argument values.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// The kind named by a typed `%kind` placeholder.
///
/// Unknown kinds are kept verbatim in [`PlaceholderKind::Other`] and treated as opaque strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PlaceholderKind {
    /// `%b`
    Boolean,
    /// `%i`
    Integer,
    /// `%d`
    Decimal,
    /// `%s`
    String,
    /// `%blob`
    Blob,
    /// `%url`
    Url,
    /// `%email`
    Email,
    /// `%ds`, `YYYY-MM-DD`
    DateStamp,
    /// `%ts`, `HH:MM:SS`
    TimeStamp,
    /// `%dt`, `YYYY-MM-DD HH:MM:SS`
    DateTimeStamp,
    /// `%ls`, a "contains" match; the bound value is wrapped in `%...%`.
    Contains,
    Other(String),
}

impl PlaceholderKind {
    /// Parse the word following `%` in a template.
    #[must_use]
    pub fn from_token(token: &str) -> Self {
        match token {
            "b" => PlaceholderKind::Boolean,
            "i" => PlaceholderKind::Integer,
            "d" => PlaceholderKind::Decimal,
            "s" => PlaceholderKind::String,
            "blob" => PlaceholderKind::Blob,
            "url" => PlaceholderKind::Url,
            "email" => PlaceholderKind::Email,
            "ds" => PlaceholderKind::DateStamp,
            "ts" => PlaceholderKind::TimeStamp,
            "dt" => PlaceholderKind::DateTimeStamp,
            "ls" => PlaceholderKind::Contains,
            other => PlaceholderKind::Other(other.to_string()),
        }
    }

    #[must_use]
    pub fn token(&self) -> &str {
        match self {
            PlaceholderKind::Boolean => "b",
            PlaceholderKind::Integer => "i",
            PlaceholderKind::Decimal => "d",
            PlaceholderKind::String => "s",
            PlaceholderKind::Blob => "blob",
            PlaceholderKind::Url => "url",
            PlaceholderKind::Email => "email",
            PlaceholderKind::DateStamp => "ds",
            PlaceholderKind::TimeStamp => "ts",
            PlaceholderKind::DateTimeStamp => "dt",
            PlaceholderKind::Contains => "ls",
            PlaceholderKind::Other(token) => token,
        }
    }

    /// Human readable name used in `InvalidArgument` messages.
    #[must_use]
    pub fn description(&self) -> &str {
        match self {
            PlaceholderKind::Boolean => "boolean",
            PlaceholderKind::Integer => "integer",
            PlaceholderKind::Decimal => "decimal",
            PlaceholderKind::String => "string",
            PlaceholderKind::Blob => "blob",
            PlaceholderKind::Url => "url",
            PlaceholderKind::Email => "email",
            PlaceholderKind::DateStamp => "date stamp",
            PlaceholderKind::TimeStamp => "timestamp",
            PlaceholderKind::DateTimeStamp => "datetime stamp",
            PlaceholderKind::Contains => "string",
            PlaceholderKind::Other(token) => token,
        }
    }

    fn is_numeric(&self) -> bool {
        matches!(
            self,
            PlaceholderKind::Integer | PlaceholderKind::Decimal | PlaceholderKind::Boolean
        )
    }
}

impl fmt::Display for PlaceholderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.token())
    }
}

static INTEGER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-?[0-9]+$").unwrap());
static DECIMAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?[0-9]+(\.[0-9]+)?$").unwrap());
static SCIENTIFIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?[0-9]+(\.[0-9]+)?[eE][-+]?[0-9]+$").unwrap());
static DATE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());
static TIME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{2}:\d{2}:\d{2}$").unwrap());
static DATETIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}$").unwrap());
// local@domain.tld, dot-atom local part, hostname labels without leading/trailing hyphens
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@([A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z]{2,}$",
    )
    .unwrap()
});
static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z][A-Za-z0-9+.-]*://([^\s/?#@]+@)?([A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?(\.[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?)*|\[[0-9A-Fa-f:.]+\])(:[0-9]{1,5})?([/?#][^\s]*)?$",
    )
    .unwrap()
});

/// Validate and normalise `raw` for `kind`.
///
/// Returns the normalised string, or `None` when the value is out of domain. Empty strings
/// coerce to `0` for the numeric kinds and scientific-notation decimals are rewritten in
/// fixed-point form before checking.
#[must_use]
pub fn validate(kind: &PlaceholderKind, raw: &str) -> Option<String> {
    let value = if kind.is_numeric() && raw.is_empty() {
        "0".to_string()
    } else if *kind == PlaceholderKind::Decimal && SCIENTIFIC_RE.is_match(raw) {
        fixed_point(raw)?
    } else {
        raw.to_string()
    };

    let valid = match kind {
        PlaceholderKind::Integer => INTEGER_RE.is_match(&value),
        PlaceholderKind::Decimal => DECIMAL_RE.is_match(&value),
        PlaceholderKind::Boolean => value == "0" || value == "1",
        PlaceholderKind::Email => EMAIL_RE.is_match(&value),
        PlaceholderKind::Url => URL_RE.is_match(&value),
        PlaceholderKind::DateStamp => DATE_RE.is_match(&value),
        PlaceholderKind::TimeStamp => TIME_RE.is_match(&value),
        PlaceholderKind::DateTimeStamp => DATETIME_RE.is_match(&value),
        PlaceholderKind::String
        | PlaceholderKind::Blob
        | PlaceholderKind::Contains
        | PlaceholderKind::Other(_) => true,
    };

    valid.then_some(value)
}

fn fixed_point(raw: &str) -> Option<String> {
    let parsed: f64 = raw.parse().ok()?;
    if !parsed.is_finite() {
        return None;
    }
    let mut out = format!("{parsed:.6}");
    if out.contains('.') {
        while out.ends_with('0') {
            out.pop();
        }
        if out.ends_with('.') {
            out.pop();
        }
    }
    Some(out)
}
