//! Directory client abstraction and its LDAP implementation.

use crate::{
    dn::{DistinguishedName, Rdn},
    location::Location,
    object::{DirectoryObject, ObjectAttributes, SearchResults},
    Result,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use dirfacade_core::{DirectoryConfig, Error};
use ldap3::{controls::RawControl, LdapConnAsync, LdapConnSettings, Mod, Scope, SearchEntry};
use native_tls::{Certificate, TlsConnector};
use std::collections::HashSet;
use std::fs;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Active Directory "show deleted objects" control.
const SHOW_DELETED_OID: &str = "1.2.840.113556.1.4.417";

const SERVICE: &str = "ldap";

/// Which attributes a search should return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeSelection {
    /// Every user attribute (`*`).
    All,
    /// Only the named attributes.
    Named(Vec<String>),
}

/// Whether group membership should be included in search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    /// Membership attributes are not requested.
    None,
    /// All membership information (`memberOf`) is requested.
    All,
}

/// Parameters for a subtree search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    /// Base DN to search beneath.
    pub base_dn: String,
    /// LDAP filter expression.
    pub filter: String,
    /// Attributes to return.
    pub attributes: AttributeSelection,
    /// Membership information to return.
    pub include_membership: Membership,
    /// Whether tombstoned entries are included.
    pub include_deleted: bool,
}

impl SearchParams {
    /// Full-attribute search with membership and without deleted entries.
    #[must_use]
    pub fn new(base_dn: impl Into<String>, filter: impl Into<String>) -> Self {
        Self {
            base_dn: base_dn.into(),
            filter: filter.into(),
            attributes: AttributeSelection::All,
            include_membership: Membership::All,
            include_deleted: false,
        }
    }

    /// Restricts the returned attributes.
    #[must_use]
    pub fn with_attributes(mut self, attributes: AttributeSelection) -> Self {
        self.attributes = attributes;
        self
    }

    /// Sets whether membership information is returned.
    #[must_use]
    pub const fn with_membership(mut self, membership: Membership) -> Self {
        self.include_membership = membership;
        self
    }

    /// Attribute list sent to the server.
    #[must_use]
    pub fn requested_attributes(&self) -> Vec<String> {
        let mut attributes = match &self.attributes {
            AttributeSelection::All => vec!["*".to_string()],
            AttributeSelection::Named(names) => {
                let mut names = names.clone();
                if !names.iter().any(|n| n.eq_ignore_ascii_case("objectClass")) {
                    names.push("objectClass".to_string());
                }
                names
            }
        };
        if self.include_membership == Membership::All
            && !attributes.iter().any(|a| a.eq_ignore_ascii_case("memberOf"))
        {
            attributes.push("memberOf".to_string());
        }
        attributes
    }
}

/// LDAP modification request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryModification {
    /// Add attribute values.
    Add {
        /// Attribute to modify.
        attribute: String,
        /// Values to add.
        values: Vec<String>,
    },
    /// Replace attribute values.
    Replace {
        /// Attribute to modify.
        attribute: String,
        /// Replacement values (empty removes attribute).
        values: Vec<String>,
    },
}

impl From<&DirectoryModification> for Mod<String> {
    fn from(modification: &DirectoryModification) -> Self {
        match modification {
            DirectoryModification::Add { attribute, values } => Mod::Add(
                attribute.clone(),
                values.iter().cloned().collect::<HashSet<_>>(),
            ),
            DirectoryModification::Replace { attribute, values } => Mod::Replace(
                attribute.clone(),
                values.iter().cloned().collect::<HashSet<_>>(),
            ),
        }
    }
}

/// Operations the facade needs from a directory server.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Runs a subtree search and categorizes the entries found.
    async fn find(&self, params: &SearchParams) -> Result<SearchResults>;

    /// Creates the entry `<rdn>,<location><domain base>` and returns its DN.
    async fn create(
        &self,
        rdn: &Rdn,
        location: &Location,
        attributes: &ObjectAttributes,
    ) -> Result<DistinguishedName>;

    /// Deletes the entry named `dn`.
    async fn delete_by_dn(&self, dn: &str) -> Result<()>;

    /// Applies modifications to the entry named `dn`.
    async fn modify(&self, dn: &str, modifications: &[DirectoryModification]) -> Result<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub(crate) trait LdapSession: Send {
    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<()>;
    async fn search(&mut self, params: &SearchParams) -> Result<Vec<DirectoryObject>>;
    async fn add(&mut self, dn: &str, attributes: &ObjectAttributes) -> Result<()>;
    async fn delete(&mut self, dn: &str) -> Result<()>;
    async fn modify(&mut self, dn: &str, modifications: &[DirectoryModification]) -> Result<()>;
    async fn unbind(&mut self) -> Result<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub(crate) trait LdapConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn LdapSession>>;
}

/// Directory client backed by `ldap3`, binding as the configured admin per operation.
pub struct LdapDirectoryClient {
    config: Arc<DirectoryConfig>,
    base_dn: String,
    connector: Box<dyn LdapConnector>,
}

impl LdapDirectoryClient {
    /// Creates a client that uses the real LDAP connector.
    #[must_use]
    pub fn new(config: DirectoryConfig) -> Self {
        let config = Arc::new(config);
        let connector: Box<dyn LdapConnector> = Box::new(RealLdapConnector::new(config.clone()));
        Self::from_parts(config, connector)
    }

    #[cfg(test)]
    #[must_use]
    pub(crate) fn with_connector(config: DirectoryConfig, connector: Box<dyn LdapConnector>) -> Self {
        Self::from_parts(Arc::new(config), connector)
    }

    fn from_parts(config: Arc<DirectoryConfig>, connector: Box<dyn LdapConnector>) -> Self {
        Self {
            base_dn: config.domain().base_dn(),
            config,
            connector,
        }
    }

    /// Returns the client configuration.
    #[must_use]
    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    async fn admin_session(&self) -> Result<Box<dyn LdapSession>> {
        let mut session = self.connector.connect().await?;
        self.execute_with_timeout(
            session.simple_bind(self.config.bind_dn(), self.config.bind_password()),
        )
        .await?;
        Ok(session)
    }

    async fn release(&self, mut session: Box<dyn LdapSession>) {
        if let Err(err) = self.execute_with_timeout(session.unbind()).await {
            warn!("LDAP unbind failed: {err}");
        }
    }

    async fn execute_with_timeout<F, T>(&self, fut: F) -> Result<T>
    where
        F: std::future::Future<Output = Result<T>>,
    {
        timeout(self.config.operation_timeout(), fut)
            .await
            .map_err(|_| Error::Timeout("LDAP operation timed out".to_string()))?
    }
}

#[async_trait]
impl DirectoryClient for LdapDirectoryClient {
    async fn find(&self, params: &SearchParams) -> Result<SearchResults> {
        debug!(base = %params.base_dn, filter = %params.filter, "searching directory");
        let mut session = self.admin_session().await?;
        let outcome = self.execute_with_timeout(session.search(params)).await;
        self.release(session).await;
        Ok(SearchResults::categorize(outcome?))
    }

    async fn create(
        &self,
        rdn: &Rdn,
        location: &Location,
        attributes: &ObjectAttributes,
    ) -> Result<DistinguishedName> {
        let parent = DistinguishedName::parse(location.resolve(&self.base_dn))?;
        let dn = DistinguishedName::from(rdn.clone()).join(&parent);
        let dn_string = dn.to_string();
        debug!(dn = %dn_string, "creating directory entry");

        let mut session = self.admin_session().await?;
        let outcome = self
            .execute_with_timeout(session.add(&dn_string, attributes))
            .await;
        self.release(session).await;
        outcome?;

        info!(dn = %dn_string, "directory entry created");
        Ok(dn)
    }

    async fn delete_by_dn(&self, dn: &str) -> Result<()> {
        debug!(dn = %dn, "deleting directory entry");
        let mut session = self.admin_session().await?;
        let outcome = self.execute_with_timeout(session.delete(dn)).await;
        self.release(session).await;
        outcome?;

        info!(dn = %dn, "directory entry deleted");
        Ok(())
    }

    async fn modify(&self, dn: &str, modifications: &[DirectoryModification]) -> Result<()> {
        debug!(dn = %dn, count = modifications.len(), "modifying directory entry");
        let mut session = self.admin_session().await?;
        let outcome = self
            .execute_with_timeout(session.modify(dn, modifications))
            .await;
        self.release(session).await;
        outcome?;

        info!(dn = %dn, "directory entry modified");
        Ok(())
    }
}

/// Real LDAP connector backed by `ldap3`.
pub struct RealLdapConnector {
    config: Arc<DirectoryConfig>,
}

impl RealLdapConnector {
    /// Creates a new connector instance.
    #[must_use]
    pub fn new(config: Arc<DirectoryConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl LdapConnector for RealLdapConnector {
    async fn connect(&self) -> Result<Box<dyn LdapSession>> {
        let settings = build_ldap_settings(&self.config)?;
        let (conn, ldap) = LdapConnAsync::with_settings(settings, self.config.url())
            .await
            .map_err(map_ldap_error)?;
        ldap3::drive!(conn);
        Ok(Box::new(RealLdapSession { inner: ldap }))
    }
}

struct RealLdapSession {
    inner: ldap3::Ldap,
}

#[async_trait]
impl LdapSession for RealLdapSession {
    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<()> {
        let result = self
            .inner
            .simple_bind(dn, password)
            .await
            .map_err(map_ldap_error)?;
        result.success().map_err(map_ldap_error)?;
        Ok(())
    }

    async fn search(&mut self, params: &SearchParams) -> Result<Vec<DirectoryObject>> {
        let ldap = &mut self.inner;
        if params.include_deleted {
            ldap.with_controls(vec![RawControl {
                ctype: SHOW_DELETED_OID.to_string(),
                crit: true,
                val: None,
            }]);
        }

        let result = ldap
            .search(
                &params.base_dn,
                Scope::Subtree,
                &params.filter,
                params.requested_attributes(),
            )
            .await
            .map_err(map_ldap_error)?;
        let (entries, _) = result.success().map_err(map_ldap_error)?;
        Ok(entries
            .into_iter()
            .map(|entry| object_from_entry(SearchEntry::construct(entry)))
            .collect())
    }

    async fn add(&mut self, dn: &str, attributes: &ObjectAttributes) -> Result<()> {
        let attrs = attributes
            .iter()
            .filter(|(_, values)| !values.is_empty())
            .map(|(name, values)| {
                (
                    name.as_str(),
                    values.iter().map(String::as_str).collect::<HashSet<_>>(),
                )
            })
            .collect::<Vec<_>>();

        let result = self.inner.add(dn, attrs).await.map_err(map_ldap_error)?;
        result.success().map_err(map_ldap_error)?;
        Ok(())
    }

    async fn delete(&mut self, dn: &str) -> Result<()> {
        let result = self.inner.delete(dn).await.map_err(map_ldap_error)?;
        result.success().map_err(map_ldap_error)?;
        Ok(())
    }

    async fn modify(&mut self, dn: &str, modifications: &[DirectoryModification]) -> Result<()> {
        let mods = modifications.iter().map(Mod::<String>::from).collect::<Vec<_>>();
        let result = self.inner.modify(dn, mods).await.map_err(map_ldap_error)?;
        result.success().map_err(map_ldap_error)?;
        Ok(())
    }

    async fn unbind(&mut self) -> Result<()> {
        self.inner.unbind().await.map_err(map_ldap_error)
    }
}

/// Binary values (`objectGUID`, `objectSid`, ...) are carried base64-encoded.
fn object_from_entry(entry: SearchEntry) -> DirectoryObject {
    let mut attributes: ObjectAttributes = entry.attrs.into_iter().collect();
    for (name, values) in entry.bin_attrs {
        attributes
            .entry(name)
            .or_default()
            .extend(values.iter().map(|value| BASE64.encode(value)));
    }
    DirectoryObject::new(entry.dn, attributes)
}

fn build_ldap_settings(config: &DirectoryConfig) -> Result<LdapConnSettings> {
    let mut settings = LdapConnSettings::new().set_conn_timeout(config.connection_timeout());

    if !config.tls_verify() {
        let connector = TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|err| {
                Error::ConfigError(format!("failed to construct TLS connector: {err}"))
            })?;
        settings = settings.set_connector(connector).set_no_tls_verify(true);
    } else if let Some(cert_path) = config.tls_ca_cert() {
        let pem = fs::read(cert_path).map_err(|err| {
            Error::ConfigError(format!(
                "failed to read directory CA certificate {}: {err}",
                cert_path.display()
            ))
        })?;
        let certificate = Certificate::from_pem(&pem).map_err(|err| {
            Error::ConfigError(format!("invalid directory CA certificate: {err}"))
        })?;
        let connector = TlsConnector::builder()
            .add_root_certificate(certificate)
            .build()
            .map_err(|err| {
                Error::ConfigError(format!("failed to load directory CA certificate: {err}"))
            })?;
        settings = settings.set_connector(connector);
    }

    Ok(settings)
}

fn map_ldap_error(err: ldap3::LdapError) -> Error {
    Error::ExternalServiceError {
        service: SERVICE.to_string(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> DirectoryConfig {
        DirectoryConfig::new(
            "ldaps://dc1.example.com",
            "example.com",
            "cn=admin,dc=example,dc=com",
            "secret",
        )
        .unwrap()
    }

    fn entry(name: &str, class: &str) -> DirectoryObject {
        let mut attributes = ObjectAttributes::new();
        attributes.insert("cn".to_string(), vec![name.to_string()]);
        attributes.insert("objectClass".to_string(), vec![class.to_string()]);
        DirectoryObject::new(format!("CN={name},dc=example,dc=com"), attributes)
    }

    fn bound_session() -> MockLdapSession {
        let mut session = MockLdapSession::new();
        session
            .expect_simple_bind()
            .withf(|dn, password| dn == "cn=admin,dc=example,dc=com" && password == "secret")
            .times(1)
            .returning(|_, _| Ok(()));
        session.expect_unbind().times(1).returning(|| Ok(()));
        session
    }

    fn client_with(session: MockLdapSession) -> LdapDirectoryClient {
        let mut connector = MockLdapConnector::new();
        connector
            .expect_connect()
            .times(1)
            .return_once(move || Ok(Box::new(session)));
        LdapDirectoryClient::with_connector(sample_config(), Box::new(connector))
    }

    #[test]
    fn requested_attributes_include_membership() {
        let params = SearchParams::new("dc=example,dc=com", "(cn=x)");
        assert_eq!(params.requested_attributes(), vec!["*", "memberOf"]);

        let named = params
            .with_attributes(AttributeSelection::Named(vec!["cn".to_string()]))
            .with_membership(Membership::None);
        assert_eq!(named.requested_attributes(), vec!["cn", "objectClass"]);
    }

    #[tokio::test]
    async fn find_categorizes_entries() {
        let mut session = bound_session();
        session
            .expect_search()
            .withf(|params| params.filter == "(objectClass=*)" && !params.include_deleted)
            .returning(|_| {
                Ok(vec![
                    entry("alice", "user"),
                    entry("printer1", "printQueue"),
                    entry("admins", "group"),
                ])
            });

        let client = client_with(session);
        let results = client
            .find(&SearchParams::new("dc=example,dc=com", "(objectClass=*)"))
            .await
            .unwrap();

        assert_eq!(results.users.len(), 1);
        assert_eq!(results.groups.len(), 1);
        assert_eq!(results.other.len(), 1);
    }

    #[tokio::test]
    async fn find_error_still_unbinds() {
        let mut session = bound_session();
        session.expect_search().returning(|_| {
            Err(Error::ExternalServiceError {
                service: "ldap".to_string(),
                message: "noSuchObject".to_string(),
            })
        });

        let client = client_with(session);
        let result = client
            .find(&SearchParams::new("OU=Missing,dc=example,dc=com", "(cn=x)"))
            .await;
        assert!(matches!(result, Err(Error::ExternalServiceError { .. })));
    }

    #[tokio::test]
    async fn create_builds_dn_under_location() {
        let mut session = bound_session();
        session
            .expect_add()
            .withf(|dn, attributes| {
                dn == "CN=printer1,OU=Printers,dc=example,dc=com"
                    && attributes.get("cn") == Some(&vec!["printer1".to_string()])
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let client = client_with(session);
        let mut attributes = ObjectAttributes::new();
        attributes.insert("cn".to_string(), vec!["printer1".to_string()]);
        let dn = client
            .create(
                &Rdn::new("CN", "printer1"),
                &Location::parse("OU=Printers").unwrap(),
                &attributes,
            )
            .await
            .unwrap();

        assert_eq!(dn.to_string(), "CN=printer1,OU=Printers,dc=example,dc=com");
    }

    #[tokio::test]
    async fn create_escapes_name_in_dn() {
        let mut session = bound_session();
        session
            .expect_add()
            .withf(|dn, _| dn == "CN=x\\,OU\\=Admins,dc=example,dc=com")
            .times(1)
            .returning(|_, _| Ok(()));

        let client = client_with(session);
        let dn = client
            .create(
                &Rdn::new("CN", "x,OU=Admins"),
                &Location::root(),
                &ObjectAttributes::new(),
            )
            .await
            .unwrap();

        let base = DistinguishedName::parse("dc=example,dc=com").unwrap();
        assert_eq!(
            dn,
            DistinguishedName::from(Rdn::new("CN", "x,OU=Admins")).join(&base)
        );
    }

    #[test]
    fn binary_attributes_are_base64_encoded() {
        let entry = SearchEntry {
            dn: "CN=printer1,dc=example,dc=com".to_string(),
            attrs: [("cn".to_string(), vec!["printer1".to_string()])]
                .into_iter()
                .collect(),
            bin_attrs: [("objectGUID".to_string(), vec![vec![0xde, 0xad, 0xbe, 0xef]])]
                .into_iter()
                .collect(),
        };

        let object = object_from_entry(entry);
        assert_eq!(object.dn, "CN=printer1,dc=example,dc=com");
        assert_eq!(object.first("cn"), Some("printer1"));
        assert_eq!(object.first("objectGUID"), Some("3q2+7w=="));
    }

    #[tokio::test]
    async fn delete_by_dn_deletes_entry() {
        let mut session = bound_session();
        session
            .expect_delete()
            .with(mockall::predicate::eq("CN=printer1,dc=example,dc=com"))
            .times(1)
            .returning(|_| Ok(()));

        let client = client_with(session);
        client
            .delete_by_dn("CN=printer1,dc=example,dc=com")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn modify_passes_modifications() {
        let mut session = bound_session();
        session
            .expect_modify()
            .withf(|dn, mods| {
                dn == "CN=ops,dc=example,dc=com"
                    && mods.to_vec()
                        == vec![DirectoryModification::Add {
                            attribute: "member".to_string(),
                            values: vec!["CN=printer1,dc=example,dc=com".to_string()],
                        }]
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let client = client_with(session);
        client
            .modify(
                "CN=ops,dc=example,dc=com",
                &[DirectoryModification::Add {
                    attribute: "member".to_string(),
                    values: vec!["CN=printer1,dc=example,dc=com".to_string()],
                }],
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn bind_failure_is_reported() {
        let mut session = MockLdapSession::new();
        session.expect_simple_bind().returning(|_, _| {
            Err(Error::ExternalServiceError {
                service: "ldap".to_string(),
                message: "invalidCredentials".to_string(),
            })
        });
        session.expect_search().never();

        let mut connector = MockLdapConnector::new();
        connector
            .expect_connect()
            .return_once(move || Ok(Box::new(session)));
        let client = LdapDirectoryClient::with_connector(sample_config(), Box::new(connector));

        let result = client
            .find(&SearchParams::new("dc=example,dc=com", "(cn=x)"))
            .await;
        assert!(matches!(result, Err(Error::ExternalServiceError { .. })));
    }
}
