use crate::models::Coordinates;
use serde::{Deserialize, Serialize};

/// A point a route passes through, with optional free-text labels.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Location {
    #[serde(flatten)]
    pub coordinates: Coordinates,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Location {
    pub fn new(coordinates: Coordinates) -> Self {
        Location {
            coordinates,
            address: None,
            name: None,
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Display label: the place name if set, otherwise the address
    pub fn label(&self) -> Option<&str> {
        self.name.as_deref().or(self.address.as_deref())
    }
}

impl From<Coordinates> for Location {
    fn from(coordinates: Coordinates) -> Self {
        Location::new(coordinates)
    }
}
