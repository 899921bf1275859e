//! Marketplace role names and the parsed [`Role`] type.
//!
//! The constants must match the values stored in the backend's
//! `user_role.role` column.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const ROLE_CLIENT: &str = "client";
pub const ROLE_COMPANY: &str = "company";

/// A user's marketplace role.
///
/// Unrecognised role strings are kept verbatim so they can be cached and
/// displayed, but they grant no capabilities.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    /// Buyer: joins pools and tracks their own requests.
    Client,
    /// Seller: creates products and pools, views analytics.
    Company,
    Other(String),
}

impl Role {
    /// Parse a stored role string. Matching is exact; the backend never
    /// emits mixed case.
    pub fn from_str_value(s: &str) -> Self {
        match s {
            ROLE_CLIENT => Self::Client,
            ROLE_COMPANY => Self::Company,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Client => ROLE_CLIENT,
            Self::Company => ROLE_COMPANY,
            Self::Other(raw) => raw,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_str_value(&raw))
    }
}
