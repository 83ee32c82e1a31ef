//! Closed vocabularies stored as text columns.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What kind of grouping a collective is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectiveKind {
    Family,
    Company,
    Club,
    Household,
    Other,
}

impl CollectiveKind {
    pub const ALL: [CollectiveKind; 5] = [
        CollectiveKind::Family,
        CollectiveKind::Company,
        CollectiveKind::Club,
        CollectiveKind::Household,
        CollectiveKind::Other,
    ];

    pub fn as_db_str(&self) -> &'static str {
        match self {
            CollectiveKind::Family => "family",
            CollectiveKind::Company => "company",
            CollectiveKind::Club => "club",
            CollectiveKind::Household => "household",
            CollectiveKind::Other => "other",
        }
    }

    pub fn from_db_str(s: &str) -> Result<Self, String> {
        match s.to_ascii_lowercase().as_str() {
            "family" => Ok(CollectiveKind::Family),
            "company" => Ok(CollectiveKind::Company),
            "club" => Ok(CollectiveKind::Club),
            "household" => Ok(CollectiveKind::Household),
            "other" => Ok(CollectiveKind::Other),
            _ => Err(format!("Invalid collective kind: {}", s)),
        }
    }

    /// Role names offered to users for this kind. Roles are free text; these
    /// are suggestions only.
    pub fn suggested_roles(&self) -> &'static [&'static str] {
        match self {
            CollectiveKind::Family => &["parent", "child", "sibling", "partner", "grandparent", "cousin"],
            CollectiveKind::Company => &["colleague", "manager", "report", "founder", "client"],
            CollectiveKind::Club => &["member", "organizer", "captain", "coach"],
            CollectiveKind::Household => &["resident", "roommate", "landlord"],
            CollectiveKind::Other => &["member"],
        }
    }
}

impl fmt::Display for CollectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_db_str())
    }
}

impl FromStr for CollectiveKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

/// Kind of a significant date stored on a contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateKind {
    Birthday,
    Anniversary,
    Other,
}

impl DateKind {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            DateKind::Birthday => "birthday",
            DateKind::Anniversary => "anniversary",
            DateKind::Other => "other",
        }
    }

    pub fn from_db_str(s: &str) -> Result<Self, String> {
        match s {
            "birthday" => Ok(DateKind::Birthday),
            "anniversary" => Ok(DateKind::Anniversary),
            "other" => Ok(DateKind::Other),
            _ => Err(format!("Invalid date kind: {}", s)),
        }
    }
}

impl fmt::Display for DateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_db_str())
    }
}
