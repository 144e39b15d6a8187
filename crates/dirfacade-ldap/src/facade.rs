//! High-level object operations over a [`DirectoryClient`].
//!
//! The facade shapes caller options into directory searches and mutations and
//! normalizes what comes back. Lookups that find nothing resolve to `Ok(None)`;
//! operations that need an existing object fail with
//! [`Error::ObjectNotFound`] before any mutation is attempted.

use std::sync::Arc;
use tracing::{debug, warn};
use validator::Validate;

use crate::attributes::{AttributeChanges, AttributeUpdater, DirectoryAttributes};
use crate::client::{DirectoryClient, SearchParams};
use crate::dn::{DistinguishedName, Rdn};
use crate::filter::{generic_object_filter, ANY_OBJECT};
use crate::group::{DirectoryGroups, GroupMembership, MembershipUpdate};
use crate::location::Location;
use crate::object::{DirectoryObject, ObjectType};
use crate::options::{NewObject, ObjectOptions};
use crate::processor;
use crate::Result;
use dirfacade_core::{Domain, Error};

/// Create, find, remove, group and attribute operations on generic directory objects.
#[derive(Clone)]
pub struct ObjectFacade {
    client: Arc<dyn DirectoryClient>,
    groups: Arc<dyn GroupMembership>,
    attributes: Arc<dyn AttributeUpdater>,
    domain: Domain,
}

impl ObjectFacade {
    /// Creates a facade using directory-backed group and attribute collaborators.
    #[must_use]
    pub fn new(client: Arc<dyn DirectoryClient>, domain: Domain) -> Self {
        let groups = Arc::new(DirectoryGroups::new(client.clone(), &domain));
        let attributes = Arc::new(DirectoryAttributes::new(client.clone(), &domain));
        Self {
            client,
            groups,
            attributes,
            domain,
        }
    }

    /// Replaces the group membership collaborator.
    #[must_use]
    pub fn with_groups(mut self, groups: Arc<dyn GroupMembership>) -> Self {
        self.groups = groups;
        self
    }

    /// Replaces the attribute update collaborator.
    #[must_use]
    pub fn with_attribute_updater(mut self, attributes: Arc<dyn AttributeUpdater>) -> Self {
        self.attributes = attributes;
        self
    }

    /// Returns the domain the facade operates in.
    #[must_use]
    pub const fn domain(&self) -> &Domain {
        &self.domain
    }

    /// Lists every object beneath the requested location.
    ///
    /// # Errors
    ///
    /// Returns the location or search error.
    pub async fn get_all_objects(&self, opts: &ObjectOptions) -> Result<Vec<DirectoryObject>> {
        self.find_by_type(opts, ObjectType::All).await
    }

    /// Creates `CN=<name>` beneath the requested location and returns its DN.
    ///
    /// The name is escaped in the DN. The new entry's `cn` is always set to `name`,
    /// replacing a supplied `cn` under any casing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] for an empty name, or the location or
    /// directory error unchanged.
    pub async fn add_object(&self, new_object: &NewObject) -> Result<DistinguishedName> {
        new_object
            .validate()
            .map_err(|_| Error::InvalidRequest("object name must not be empty".to_string()))?;

        let location = Location::parse_opt(new_object.location.as_deref())?;
        let mut attributes = new_object.attributes.clone();
        attributes.retain(|name, _| !name.eq_ignore_ascii_case("cn"));
        attributes.insert("cn".to_string(), vec![new_object.name.clone()]);

        let rdn = Rdn::new("CN", new_object.name.as_str());
        self.client.create(&rdn, &location, &attributes).await
    }

    /// Finds the first generic object (neither user nor group) named `object_name`.
    ///
    /// A missing name is treated as the empty string. Finding nothing is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns the location or search error.
    pub async fn find_object(
        &self,
        object_name: Option<&str>,
        opts: &ObjectOptions,
    ) -> Result<Option<DirectoryObject>> {
        let object_name = object_name.unwrap_or_default();
        let params = SearchParams::new(self.search_base(opts)?, generic_object_filter(object_name));
        debug!(base = %params.base_dn, filter = %params.filter, "finding object");

        let results = self.client.find(&params).await?;
        if results.other.is_empty() {
            return Ok(None);
        }
        Ok(processor::process(opts, results.other).into_iter().next())
    }

    /// Deletes the object named `object_name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ObjectNotFound`] if the object does not exist, otherwise the
    /// search or delete error.
    pub async fn remove_object(&self, object_name: &str, opts: &ObjectOptions) -> Result<()> {
        let object = self.require_object(object_name, opts).await?;
        self.client.delete_by_dn(&object.dn).await
    }

    /// Adds the object named `object_name` to the group `group_name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ObjectNotFound`] if the object does not exist. Group
    /// collaborator failures come back as [`Error::Tagged`].
    pub async fn add_to_group(
        &self,
        object_name: &str,
        group_name: &str,
        opts: &ObjectOptions,
    ) -> Result<()> {
        let object = self.require_object(object_name, opts).await?;
        self.groups
            .add_members(group_name, &MembershipUpdate::single(object.dn))
            .await
            .map_err(tag_collaborator_error)
    }

    /// Replaces attributes on the object named `object_name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ObjectNotFound`] if the object does not exist. Attribute
    /// collaborator failures come back as [`Error::Tagged`].
    pub async fn set_attributes(
        &self,
        object_name: &str,
        opts: &ObjectOptions,
        changes: &AttributeChanges,
    ) -> Result<()> {
        self.require_object(object_name, opts).await?;
        self.attributes
            .update_attributes(object_name, opts, changes)
            .await
            .map_err(tag_collaborator_error)
    }

    async fn find_by_type(
        &self,
        opts: &ObjectOptions,
        object_type: ObjectType,
    ) -> Result<Vec<DirectoryObject>> {
        let params = SearchParams::new(self.search_base(opts)?, ANY_OBJECT);
        let results = self.client.find(&params).await?;
        Ok(processor::process(opts, results.select(object_type)))
    }

    async fn require_object(
        &self,
        object_name: &str,
        opts: &ObjectOptions,
    ) -> Result<DirectoryObject> {
        self.find_object(Some(object_name), opts)
            .await?
            .filter(|object| !object.is_empty())
            .ok_or_else(|| Error::ObjectNotFound(object_name.to_string()))
    }

    fn search_base(&self, opts: &ObjectOptions) -> Result<String> {
        let location = Location::parse_opt(opts.location.as_deref())?;
        Ok(location.resolve(&self.domain.base_dn()))
    }
}

fn tag_collaborator_error(err: Error) -> Error {
    if err.should_log() {
        warn!("directory collaborator failed: {err}");
    }
    Error::tagged(err)
}
