use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BrickKind {
    #[default]
    Template,
    Extension,
}

impl BrickKind {
    /// Case-insensitive, `None` for anything but `template` or `extension`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "template" => Some(BrickKind::Template),
            "extension" => Some(BrickKind::Extension),
            _ => None,
        }
    }
}

impl fmt::Display for BrickKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrickKind::Template => write!(f, "template"),
            BrickKind::Extension => write!(f, "extension"),
        }
    }
}

impl Serialize for BrickKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BrickKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        BrickKind::parse(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid brick kind {}", s)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub struct BrickParameter {
    pub name: String,
    #[serde(default)]
    pub default: String,
}

/// A reusable template unit. Immutable once loaded from its catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub struct Brick {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub kind: BrickKind,
    #[serde(default)]
    pub parameters: Vec<BrickParameter>,
    /// Brick ids, not package ids.
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(skip)]
    pub base_path: PathBuf,
    /// Paths relative to `base_path`, never including the manifest.
    #[serde(skip)]
    pub files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub struct BrickDependency {
    pub id: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub struct PackageDependency {
    pub id: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub struct Service {
    pub id: String,
    #[serde(skip)]
    pub path: PathBuf,
    #[serde(default, rename = "brickids")]
    pub brick_ids: Vec<BrickDependency>,
    /// Owned by the package layer; read on load, never persisted here.
    #[serde(skip)]
    pub dependencies: Vec<PackageDependency>,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

impl Service {
    pub fn has_brick(&self, brick_id: &str) -> bool {
        self.brick_ids.iter().any(|b| b.id == brick_id)
    }
}
