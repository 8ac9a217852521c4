/// [crate::properties] contains the value types every other module trades in: the stable
/// [Glottocode] identifier, the scarce [ExternalCode], the structural [Level] and the [Languoid]
/// record itself.
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};
use unicode_normalization::UnicodeNormalization;

use crate::error::LanguoidError;

/// Identifier slot content marking a language that stands alone, without any family.
pub const ISOLATE_MARKER: &str = "-isolate-";

/// Prefix of locally minted external codes, distinguishing them from registry codes.
pub const NOCODE_PREFIX: &str = "NOCODE_";

/// First number tried when minting a [Glottocode] for a new languoid.
pub const FIRST_MINTED_NUMBER: u16 = 1234;

static GLOTTOCODE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]{4}[0-9]{4}$").expect("static pattern"));

static ISO_CODE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z]{3}$").expect("static pattern"));

static NOCODE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^NOCODE_[A-Za-z0-9_\-]+$").expect("static pattern"));

/// Stable languoid identifier: four lowercase alphanumerics followed by four digits, e.g.
/// `abkh1242`. Doubles as the storage key of the node.
#[derive(Clone, Debug, Serialize, Deserialize, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct Glottocode(String);

impl Glottocode {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The alphabetic stem a new identifier for `name` is minted from.
    ///
    /// The name is decomposed (NFKD) so accented letters keep their base letter, then reduced to
    /// lowercase ASCII alphanumerics. The first four are used, padded by repeating the last one.
    pub fn stem_for(name: &str) -> String {
        let mut stem = name
            .nfkd()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .take(4)
            .collect::<String>();
        match stem.chars().last() {
            Some(last) => {
                while stem.len() < 4 {
                    stem.push(last);
                }
            }
            None => stem.push_str("xxxx"),
        }
        stem
    }

    /// Build `stem` + zero padded `number`. Callers must pass a stem produced by
    /// [Glottocode::stem_for].
    pub(crate) fn from_parts(stem: &str, number: u16) -> Glottocode {
        Glottocode(format!("{stem}{number:04}"))
    }
}

impl TryFrom<&str> for Glottocode {
    type Error = LanguoidError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        if GLOTTOCODE_PATTERN.is_match(value) {
            Ok(Glottocode(value.to_string()))
        } else {
            Err(LanguoidError::Format(format!(
                "'{value}' is not a valid glottocode"
            )))
        }
    }
}

impl TryFrom<String> for Glottocode {
    type Error = LanguoidError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Glottocode::try_from(value.as_str())
    }
}

impl FromStr for Glottocode {
    type Err = LanguoidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Glottocode::try_from(s)
    }
}

impl AsRef<str> for Glottocode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Glottocode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Glottocode> for String {
    fn from(val: Glottocode) -> Self {
        val.0
    }
}

/// External classification reference held by at most one languoid: either a three letter
/// ISO-style code or a locally minted `NOCODE_...` token.
#[derive(Clone, Debug, Serialize, Deserialize, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct ExternalCode(String);

impl ExternalCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_nocode(&self) -> bool {
        self.0.starts_with(NOCODE_PREFIX)
    }
}

impl TryFrom<&str> for ExternalCode {
    type Error = LanguoidError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        if ISO_CODE_PATTERN.is_match(value) || NOCODE_PATTERN.is_match(value) {
            Ok(ExternalCode(value.to_string()))
        } else {
            Err(LanguoidError::Format(format!(
                "'{value}' is neither a three letter code nor a {NOCODE_PREFIX} token"
            )))
        }
    }
}

impl TryFrom<String> for ExternalCode {
    type Error = LanguoidError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ExternalCode::try_from(value.as_str())
    }
}

impl FromStr for ExternalCode {
    type Err = LanguoidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExternalCode::try_from(s)
    }
}

impl Display for ExternalCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<ExternalCode> for String {
    fn from(val: ExternalCode) -> Self {
        val.0
    }
}

/// Structural rank of a languoid. Never free input: it follows from where a languoid is
/// mentioned in the classification and dialects texts.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Family,
    Language,
    Dialect,
}

impl Level {
    /// Whether a languoid of this level may sit directly below `parent` (`None` for the root).
    pub fn may_have_parent(&self, parent: Option<Level>) -> bool {
        match self {
            Level::Family | Level::Language => matches!(parent, None | Some(Level::Family)),
            Level::Dialect => matches!(parent, Some(Level::Language) | Some(Level::Dialect)),
        }
    }
}

impl Display for Level {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Level::Family => write!(f, "family"),
            Level::Language => write!(f, "language"),
            Level::Dialect => write!(f, "dialect"),
        }
    }
}

impl FromStr for Level {
    type Err = LanguoidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "family" => Ok(Level::Family),
            "language" => Ok(Level::Language),
            "dialect" => Ok(Level::Dialect),
            _ => Err(LanguoidError::Serialization(format!("Unknown level '{s}'"))),
        }
    }
}

/// The attributes the storage backend keeps for one node. Position (the parent link) is kept
/// by the storage layout itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeAttrs {
    pub name: String,
    pub level: Level,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ExternalCode>,
}

/// A node of the taxonomy. Relations are expressed through identifiers only; the owning
/// [crate::tree::LanguoidTree] maintains the child index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Languoid {
    pub id: Glottocode,
    pub name: String,
    pub level: Level,
    pub code: Option<ExternalCode>,
    pub parent: Option<Glottocode>,
}

impl Languoid {
    pub fn new(id: Glottocode, name: &str, level: Level, parent: Option<Glottocode>) -> Self {
        Languoid {
            id,
            name: name.to_string(),
            level,
            code: None,
            parent,
        }
    }

    pub fn with_code(mut self, code: ExternalCode) -> Self {
        self.code = Some(code);
        self
    }

    pub fn from_attrs(id: Glottocode, parent: Option<Glottocode>, attrs: NodeAttrs) -> Self {
        Languoid {
            id,
            name: attrs.name,
            level: attrs.level,
            code: attrs.code,
            parent,
        }
    }

    pub fn attrs(&self) -> NodeAttrs {
        NodeAttrs {
            name: self.name.clone(),
            level: self.level,
            code: self.code.clone(),
        }
    }
}

impl Display for Languoid {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]", self.name, self.id)?;
        if let Some(code) = &self.code {
            write!(f, "{code}")?;
        }
        Ok(())
    }
}
