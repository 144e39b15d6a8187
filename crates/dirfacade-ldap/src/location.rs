//! Organizational-unit locations.
//!
//! A location is written as a slash-separated path from the top of the tree down
//! (`Printers/Floor 2`). Segments may also be given as explicit components
//! (`OU=Printers`). Parsing produces the DN prefix that sits in front of the domain
//! naming context, deepest container first and with a trailing comma.

use std::fmt;

use crate::dn::{escape_value, unescaped_equals, Rdn};
use crate::Result;

/// Parsed OU path, stored as a DN prefix (`OU=Floor 2,OU=Printers,`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Location {
    prefix: String,
}

impl Location {
    /// The root of the naming context.
    #[must_use]
    pub const fn root() -> Self {
        Self {
            prefix: String::new(),
        }
    }

    /// Parses a location path into a DN prefix.
    ///
    /// # Errors
    ///
    /// Returns [`dirfacade_core::Error::InvalidRequest`] if a segment written as
    /// `attribute=value` is malformed.
    pub fn parse(input: &str) -> Result<Self> {
        let mut components = Vec::new();
        for segment in input.split('/').map(str::trim).filter(|s| !s.is_empty()) {
            if unescaped_equals(segment).is_some() {
                Rdn::parse(segment)?;
                components.push(segment.to_string());
            } else {
                components.push(format!("OU={}", escape_value(segment)));
            }
        }

        if components.is_empty() {
            return Ok(Self::root());
        }

        components.reverse();
        let mut prefix = components.join(",");
        prefix.push(',');
        Ok(Self { prefix })
    }

    /// Parses an optional location; `None` is the root.
    ///
    /// # Errors
    ///
    /// See [`Location::parse`].
    pub fn parse_opt(input: Option<&str>) -> Result<Self> {
        input.map_or_else(|| Ok(Self::root()), Self::parse)
    }

    /// Returns the DN prefix, empty for the root.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns true if this is the root of the naming context.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.prefix.is_empty()
    }

    /// Prepends this location to a base DN string.
    #[must_use]
    pub fn resolve(&self, base_dn: &str) -> String {
        format!("{}{base_dn}", self.prefix)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.prefix)
    }
}
