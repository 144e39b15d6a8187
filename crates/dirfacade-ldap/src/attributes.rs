//! Attribute updates on existing objects.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::client::{DirectoryClient, DirectoryModification, Membership, SearchParams};
use crate::filter::common_name_filter;
use crate::location::Location;
use crate::options::ObjectOptions;
use crate::processor;
use crate::Result;
use dirfacade_core::{Domain, Error};

/// Replacement values keyed by attribute name. An empty list removes the attribute.
pub type AttributeChanges = BTreeMap<String, Vec<String>>;

/// Applies attribute changes to a named object.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AttributeUpdater: Send + Sync {
    /// Replaces the given attributes on the object named `object_name`.
    async fn update_attributes(
        &self,
        object_name: &str,
        opts: &ObjectOptions,
        changes: &AttributeChanges,
    ) -> Result<()>;
}

/// [`AttributeUpdater`] implemented with directory searches and modifications.
pub struct DirectoryAttributes {
    client: Arc<dyn DirectoryClient>,
    base_dn: String,
}

impl DirectoryAttributes {
    /// Creates the collaborator for objects beneath `domain`.
    #[must_use]
    pub fn new(client: Arc<dyn DirectoryClient>, domain: &Domain) -> Self {
        Self {
            client,
            base_dn: domain.base_dn(),
        }
    }

    async fn resolve_dn(&self, object_name: &str, opts: &ObjectOptions) -> Result<String> {
        let location = Location::parse_opt(opts.location.as_deref())?;
        let params = SearchParams::new(
            location.resolve(&self.base_dn),
            common_name_filter(object_name),
        )
        .with_membership(Membership::None);
        let results = self.client.find(&params).await?;

        // Generic objects take precedence over users and groups sharing the name. The
        // query narrows candidates the same way the facade's lookup does.
        let candidates = results
            .other
            .into_iter()
            .chain(results.users)
            .chain(results.groups)
            .collect();
        processor::process(opts, candidates)
            .into_iter()
            .map(|object| object.dn)
            .find(|dn| !dn.is_empty())
            .ok_or_else(|| Error::ObjectNotFound(object_name.to_string()))
    }
}

#[async_trait]
impl AttributeUpdater for DirectoryAttributes {
    async fn update_attributes(
        &self,
        object_name: &str,
        opts: &ObjectOptions,
        changes: &AttributeChanges,
    ) -> Result<()> {
        let dn = self.resolve_dn(object_name, opts).await?;
        if changes.is_empty() {
            return Ok(());
        }

        let modifications = changes
            .iter()
            .map(|(attribute, values)| DirectoryModification::Replace {
                attribute: attribute.clone(),
                values: values.clone(),
            })
            .collect::<Vec<_>>();

        debug!(dn = %dn, count = modifications.len(), "replacing attributes");
        self.client.modify(&dn, &modifications).await
    }
}
