//! Group lookup and membership updates.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::client::{DirectoryClient, DirectoryModification, Membership, SearchParams};
use crate::dn::DistinguishedName;
use crate::filter::group_filter;
use crate::object::DirectoryObject;
use crate::Result;
use dirfacade_core::{Domain, Error};

/// Representation of a directory group entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Distinguished name of the group.
    pub dn: DistinguishedName,
    /// Group name (the `cn` attribute).
    pub name: String,
    /// Distinguished names of group members.
    #[serde(default)]
    pub members: Vec<DistinguishedName>,
}

impl Group {
    /// Builds a group from a directory entry.
    ///
    /// Member values that are not valid DNs are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if the entry DN is malformed or `cn` is missing.
    pub fn from_object(object: &DirectoryObject) -> Result<Self> {
        let dn = DistinguishedName::parse(&object.dn)?;
        let name = object
            .cn()
            .ok_or_else(|| {
                Error::InvalidRequest(format!("group entry `{}` missing attribute `cn`", object.dn))
            })?
            .to_string();

        let members = object
            .values("member")
            .unwrap_or_default()
            .iter()
            .filter_map(|value| match DistinguishedName::parse(value) {
                Ok(member) => Some(member),
                Err(err) => {
                    warn!("Failed to parse member DN `{value}`: {err}");
                    None
                }
            })
            .collect();

        Ok(Self {
            dn,
            name,
            members,
        })
    }

    /// Checks whether the given distinguished name is a member of this group.
    #[must_use]
    pub fn has_member(&self, member_dn: &DistinguishedName) -> bool {
        self.members.iter().any(|dn| dn == member_dn)
    }
}

/// Members to add to a group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipUpdate {
    /// Member DNs.
    pub member: Vec<String>,
}

impl MembershipUpdate {
    /// Update adding a single member.
    #[must_use]
    pub fn single(dn: impl Into<String>) -> Self {
        Self {
            member: vec![dn.into()],
        }
    }
}

/// Adds members to groups.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GroupMembership: Send + Sync {
    /// Adds the members in `update` to the group named `group_name`.
    async fn add_members(&self, group_name: &str, update: &MembershipUpdate) -> Result<()>;
}

/// [`GroupMembership`] implemented with directory searches and modifications.
pub struct DirectoryGroups {
    client: Arc<dyn DirectoryClient>,
    base_dn: String,
}

impl DirectoryGroups {
    /// Creates the collaborator for groups beneath `domain`.
    #[must_use]
    pub fn new(client: Arc<dyn DirectoryClient>, domain: &Domain) -> Self {
        Self {
            client,
            base_dn: domain.base_dn(),
        }
    }

    /// Looks up a group by name.
    ///
    /// # Errors
    ///
    /// Returns the search error, or [`Error::GroupNotFound`] when no group matches.
    pub async fn find_group(&self, group_name: &str) -> Result<Group> {
        let params = SearchParams::new(&self.base_dn, group_filter(group_name))
            .with_membership(Membership::None);
        let results = self.client.find(&params).await?;
        let entry = results
            .groups
            .into_iter()
            .next()
            .ok_or_else(|| Error::GroupNotFound(group_name.to_string()))?;
        Group::from_object(&entry)
    }
}

#[async_trait]
impl GroupMembership for DirectoryGroups {
    async fn add_members(&self, group_name: &str, update: &MembershipUpdate) -> Result<()> {
        let group = self.find_group(group_name).await?;
        let pending = update
            .member
            .iter()
            .filter(|member| {
                DistinguishedName::parse(member).map_or(true, |dn| !group.has_member(&dn))
            })
            .cloned()
            .collect::<Vec<_>>();
        if pending.is_empty() {
            debug!(group = %group.dn, "no new group members to add");
            return Ok(());
        }

        debug!(group = %group.dn, members = pending.len(), "adding group members");
        self.client
            .modify(
                &group.dn.to_string(),
                &[DirectoryModification::Add {
                    attribute: "member".to_string(),
                    values: pending,
                }],
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockDirectoryClient;
    use crate::object::{ObjectAttributes, SearchResults};

    fn group_entry(name: &str, members: &[&str]) -> DirectoryObject {
        let mut attributes = ObjectAttributes::new();
        attributes.insert("cn".to_string(), vec![name.to_string()]);
        attributes.insert("objectClass".to_string(), vec!["group".to_string()]);
        attributes.insert(
            "member".to_string(),
            members.iter().map(ToString::to_string).collect(),
        );
        DirectoryObject::new(format!("CN={name},OU=Groups,dc=example,dc=com"), attributes)
    }

    fn domain() -> Domain {
        Domain::parse("example.com").unwrap()
    }

    #[test]
    fn group_from_object_skips_bad_members() {
        let entry = group_entry("printers", &["CN=p1,dc=example,dc=com", "garbage"]);
        let group = Group::from_object(&entry).unwrap();

        assert_eq!(group.name, "printers");
        assert_eq!(group.members.len(), 1);
        assert!(group.has_member(&DistinguishedName::parse("CN=p1,dc=example,dc=com").unwrap()));
    }

    #[tokio::test]
    async fn add_members_modifies_group() {
        let mut client = MockDirectoryClient::new();
        client
            .expect_find()
            .withf(|params| {
                params.filter == "(&(objectClass=group)(cn=printers))"
                    && params.base_dn == "dc=example,dc=com"
            })
            .returning(|_| {
                Ok(SearchResults {
                    groups: vec![group_entry("printers", &[])],
                    ..SearchResults::default()
                })
            });
        client
            .expect_modify()
            .withf(|dn, mods| {
                dn == "CN=printers,OU=Groups,dc=example,dc=com"
                    && mods.to_vec()
                        == vec![DirectoryModification::Add {
                            attribute: "member".to_string(),
                            values: vec!["CN=p1,dc=example,dc=com".to_string()],
                        }]
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let groups = DirectoryGroups::new(Arc::new(client), &domain());
        groups
            .add_members("printers", &MembershipUpdate::single("CN=p1,dc=example,dc=com"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn existing_members_are_not_added_again() {
        let mut client = MockDirectoryClient::new();
        client.expect_find().returning(|_| {
            Ok(SearchResults {
                groups: vec![group_entry("printers", &["CN=p1,dc=example,dc=com"])],
                ..SearchResults::default()
            })
        });
        client.expect_modify().never();

        let groups = DirectoryGroups::new(Arc::new(client), &domain());
        groups
            .add_members("printers", &MembershipUpdate::single("CN=p1,dc=example,dc=com"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn missing_group_is_reported() {
        let mut client = MockDirectoryClient::new();
        client
            .expect_find()
            .returning(|_| Ok(SearchResults::default()));
        client.expect_modify().never();

        let groups = DirectoryGroups::new(Arc::new(client), &domain());
        let err = groups
            .add_members("nobody", &MembershipUpdate::single("CN=p1,dc=example,dc=com"))
            .await
            .unwrap_err();
        assert_eq!(err, Error::GroupNotFound("nobody".to_string()));
        assert_eq!(err.to_string(), "Group nobody does not exist.");
    }
}
