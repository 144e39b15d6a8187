//! Directory object representation and categorized search results.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attribute map keyed by attribute name; values keep server order.
pub type ObjectAttributes = BTreeMap<String, Vec<String>>;

/// A directory entry as returned by the directory client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryObject {
    /// Distinguished name of the entry.
    pub dn: String,
    /// Attribute values.
    #[serde(default)]
    pub attributes: ObjectAttributes,
}

impl DirectoryObject {
    /// Creates an object from its DN and attributes.
    #[must_use]
    pub fn new(dn: impl Into<String>, attributes: ObjectAttributes) -> Self {
        Self {
            dn: dn.into(),
            attributes,
        }
    }

    /// Returns true if the entry carries neither a DN nor any attribute.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dn.is_empty() && self.attributes.is_empty()
    }

    /// Returns the common name, if present.
    #[must_use]
    pub fn cn(&self) -> Option<&str> {
        self.first("cn")
    }

    /// Returns all values for the attribute (case-insensitive name match).
    #[must_use]
    pub fn values(&self, attribute: &str) -> Option<&[String]> {
        self.attributes
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(attribute))
            .map(|(_, values)| values.as_slice())
    }

    /// Returns the first value of the attribute if present.
    #[must_use]
    pub fn first(&self, attribute: &str) -> Option<&str> {
        self.values(attribute)
            .and_then(|values| values.first().map(String::as_str))
    }

    /// Returns true if the entry's `objectClass` contains `class` (case-insensitive).
    #[must_use]
    pub fn has_object_class(&self, class: &str) -> bool {
        self.values("objectClass")
            .is_some_and(|classes| classes.iter().any(|c| c.eq_ignore_ascii_case(class)))
    }

    /// Determines which result category the entry belongs to.
    #[must_use]
    pub fn category(&self) -> ObjectCategory {
        if self.has_object_class("group") {
            ObjectCategory::Group
        } else if self.has_object_class("user") || self.has_object_class("person") {
            ObjectCategory::User
        } else {
            ObjectCategory::Other
        }
    }
}

/// Result category of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectCategory {
    /// User (or person) entries.
    User,
    /// Group entries.
    Group,
    /// Anything else.
    Other,
}

/// Entry types selectable when listing objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    /// Users only.
    User,
    /// Groups only.
    Group,
    /// Neither users nor groups.
    Other,
    /// Every entry.
    All,
}

impl ObjectType {
    /// Returns true if entries in `category` are selected by this type.
    #[must_use]
    pub fn selects(self, category: ObjectCategory) -> bool {
        match self {
            Self::All => true,
            Self::User => category == ObjectCategory::User,
            Self::Group => category == ObjectCategory::Group,
            Self::Other => category == ObjectCategory::Other,
        }
    }
}

/// Search results split by category, each in server order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResults {
    /// User entries.
    pub users: Vec<DirectoryObject>,
    /// Group entries.
    pub groups: Vec<DirectoryObject>,
    /// All remaining entries.
    pub other: Vec<DirectoryObject>,
}

impl SearchResults {
    /// Sorts entries into their categories.
    #[must_use]
    pub fn categorize(entries: impl IntoIterator<Item = DirectoryObject>) -> Self {
        let mut results = Self::default();
        for entry in entries {
            match entry.category() {
                ObjectCategory::User => results.users.push(entry),
                ObjectCategory::Group => results.groups.push(entry),
                ObjectCategory::Other => results.other.push(entry),
            }
        }
        results
    }

    /// Consumes the results, keeping the categories `object_type` selects.
    ///
    /// Users come first, then groups, then everything else.
    #[must_use]
    pub fn select(self, object_type: ObjectType) -> Vec<DirectoryObject> {
        let mut selected = Vec::new();
        if object_type.selects(ObjectCategory::User) {
            selected.extend(self.users);
        }
        if object_type.selects(ObjectCategory::Group) {
            selected.extend(self.groups);
        }
        if object_type.selects(ObjectCategory::Other) {
            selected.extend(self.other);
        }
        selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(dn: &str, classes: &[&str]) -> DirectoryObject {
        let mut attributes = ObjectAttributes::new();
        attributes.insert(
            "objectClass".to_string(),
            classes.iter().map(ToString::to_string).collect(),
        );
        attributes.insert("cn".to_string(), vec![dn.to_string()]);
        DirectoryObject::new(format!("CN={dn},dc=example,dc=com"), attributes)
    }

    #[test]
    fn categorize_by_object_class() {
        let results = SearchResults::categorize(vec![
            entry("alice", &["top", "person", "user"]),
            entry("admins", &["top", "group"]),
            entry("printer1", &["top", "printQueue"]),
        ]);

        assert_eq!(results.users.len(), 1);
        assert_eq!(results.groups.len(), 1);
        assert_eq!(results.other.len(), 1);
        assert_eq!(results.other[0].cn(), Some("printer1"));
    }

    #[test]
    fn select_all_keeps_category_order() {
        let results = SearchResults::categorize(vec![
            entry("printer1", &["printQueue"]),
            entry("admins", &["group"]),
            entry("alice", &["user"]),
        ]);

        let names: Vec<_> = results
            .select(ObjectType::All)
            .iter()
            .filter_map(|o| o.cn().map(str::to_owned))
            .collect();
        assert_eq!(names, vec!["alice", "admins", "printer1"]);
    }

    #[test]
    fn attribute_lookup_is_case_insensitive() {
        let object = entry("printer1", &["printQueue"]);
        assert!(object.has_object_class("PRINTQUEUE"));
        assert_eq!(object.first("CN"), Some("printer1"));
        assert!(!object.is_empty());
        assert!(DirectoryObject::default().is_empty());
    }
}
