//! Entity types and unique entity identifiers.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::PolicyError;

static TYPE_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(::[A-Za-z_][A-Za-z0-9_]*)*$")
        .unwrap_or_else(|e| unreachable!("static entity type regex is valid: {e}"))
});

/// A fully-qualified entity type path such as `User` or `Infra::Host`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityType(String);

impl EntityType {
    pub fn new(path: impl Into<String>) -> Self {
        EntityType(path.into())
    }

    /// The full `::`-separated path.
    pub fn path(&self) -> &str {
        &self.0
    }
}

impl Display for EntityType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityType {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if TYPE_PATH.is_match(s) {
            Ok(EntityType(s.to_string()))
        } else {
            Err(PolicyError::ParseError(format!("invalid entity type `{s}`")))
        }
    }
}

impl From<&str> for EntityType {
    fn from(value: &str) -> Self {
        EntityType::new(value)
    }
}

/// Globally unique entity identity: a type path plus an id string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityUid {
    #[serde(rename = "type")]
    ty: EntityType,
    id: String,
}

impl EntityUid {
    pub fn new(ty: impl Into<EntityType>, id: impl Into<String>) -> Self {
        EntityUid {
            ty: ty.into(),
            id: id.into(),
        }
    }

    pub fn entity_type(&self) -> &EntityType {
        &self.ty
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Render as `Ns::Type::"id"`, escaping the id the way a policy literal would.
impl Display for EntityUid {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, r#"{}::"{}""#, self.ty, self.id.escape_debug())
    }
}

impl FromStr for EntityUid {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (ty, quoted) = s
            .split_once("::\"")
            .ok_or_else(|| PolicyError::ParseError(format!("missing quoted id in `{s}`")))?;
        let raw = quoted
            .strip_suffix('"')
            .ok_or_else(|| PolicyError::ParseError(format!("unterminated id in `{s}`")))?;
        Ok(EntityUid {
            ty: ty.parse()?,
            id: unescape_id(raw).map_err(|e| PolicyError::ParseError(format!("{e} in `{s}`")))?,
        })
    }
}

fn unescape_id(raw: &str) -> Result<String, String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('"') => out.push('"'),
                Some('\'') => out.push('\''),
                Some('\\') => out.push('\\'),
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('t') => out.push('\t'),
                Some('0') => out.push('\0'),
                Some(other) => return Err(format!("unknown escape `\\{other}`")),
                None => return Err("dangling escape".to_string()),
            },
            '"' => return Err("unescaped quote".to_string()),
            c => out.push(c),
        }
    }
    Ok(out)
}
