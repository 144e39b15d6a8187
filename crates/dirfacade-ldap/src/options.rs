//! Caller-supplied options for facade operations.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::object::ObjectAttributes;

/// Options shared by lookup operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectOptions {
    /// OU path to search beneath (`Printers/Floor 2` or `OU=Printers`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Attribute names to keep in returned objects. `dn` and `cn` are always kept.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<String>>,

    /// Case-insensitive substring that returned objects must contain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

impl ObjectOptions {
    /// Options with nothing set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts lookups to a location.
    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Restricts returned attributes.
    #[must_use]
    pub fn with_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = Some(attributes.into_iter().map(Into::into).collect());
        self
    }

    /// Filters returned objects by a substring.
    #[must_use]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }
}

/// Request to create a new directory object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct NewObject {
    /// Common name of the new object.
    #[validate(length(min = 1))]
    pub name: String,

    /// OU path to create the object in; the domain root when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Extra attributes for the entry (e.g. `objectClass`).
    #[serde(default)]
    pub attributes: ObjectAttributes,
}

impl NewObject {
    /// Creates a request for an object named `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the location.
    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Sets an attribute, replacing previous values.
    #[must_use]
    pub fn with_attribute<I, S>(mut self, attribute: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes.insert(
            attribute.into(),
            values.into_iter().map(Into::into).collect(),
        );
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_object_requires_name() {
        assert!(NewObject::new("").validate().is_err());
        assert!(NewObject::new("printer1").validate().is_ok());
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let opts: ObjectOptions = serde_json::from_str(r#"{"location":"OU=Printers"}"#).unwrap();
        assert_eq!(opts, ObjectOptions::new().with_location("OU=Printers"));
    }
}
