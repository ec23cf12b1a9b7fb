//! Strongly typed identifiers
//!
//! Surrogate ids (header, detail) are UUID-backed and generated here.
//! Externally assigned ids (asset types, steps, roles) wrap whatever the
//! administration surface hands us.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Strongly typed workflow header id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HeaderId(String);

impl HeaderId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s)
            .map(|_| Self(s.to_string()))
            .map_err(|e| format!("Invalid HeaderId format: {}", e))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for HeaderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HeaderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Strongly typed workflow detail id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DetailId(String);

impl DetailId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s)
            .map(|_| Self(s.to_string()))
            .map_err(|e| format!("Invalid DetailId format: {}", e))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for DetailId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DetailId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

macro_rules! external_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

external_id! {
    /// Asset type identifier maintained by the administration surface
    AssetTypeId
}

external_id! {
    /// Organization identifier
    OrgId
}

external_id! {
    /// Approval step identifier from the sequence configuration
    StepId
}

external_id! {
    /// Job role identifier
    JobRoleId
}

external_id! {
    /// Department identifier
    DepartmentId
}

external_id! {
    /// Employee identifier
    EmployeeId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_id_is_valid_uuid() {
        let id = HeaderId::new();
        assert!(uuid::Uuid::parse_str(id.as_str()).is_ok());
    }

    #[test]
    fn test_header_id_rejects_garbage() {
        assert!(HeaderId::from_string("not-a-uuid").is_err());
    }

    #[test]
    fn test_detail_id_round_trip() {
        let id = DetailId::new();
        let parsed = DetailId::from_string(id.as_str()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_external_id_display() {
        let asset_type = AssetTypeId::new("AT1");
        assert_eq!(asset_type.as_str(), "AT1");
        assert_eq!(format!("{}", asset_type), "AT1");
    }
}
