//! Directory object management over LDAP / Active Directory.
//!
//! [`ObjectFacade`] creates, finds, removes and updates generic directory objects
//! (anything that is neither a user nor a group). It talks to the directory through
//! the [`DirectoryClient`] trait; [`LdapDirectoryClient`] implements it with `ldap3`.

#![deny(missing_docs)]

mod attributes;
mod client;
mod dn;
mod facade;
mod filter;
mod group;
mod location;
mod object;
mod options;
mod processor;

pub use attributes::{AttributeChanges, AttributeUpdater, DirectoryAttributes};
pub use client::{
    AttributeSelection, DirectoryClient, DirectoryModification, LdapDirectoryClient, Membership,
    SearchParams,
};
pub use dn::{escape_value, DistinguishedName, DistinguishedNameError, Rdn};
pub use facade::ObjectFacade;
pub use filter::{escape_filter_value, generic_object_filter};
pub use group::{DirectoryGroups, Group, GroupMembership, MembershipUpdate};
pub use location::Location;
pub use object::{DirectoryObject, ObjectAttributes, ObjectCategory, ObjectType, SearchResults};
pub use options::{NewObject, ObjectOptions};
pub use processor::process as process_results;

/// Convenient result alias that reuses the core error type.
pub type Result<T> = dirfacade_core::Result<T>;
