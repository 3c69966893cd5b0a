use crate::{ClientConfig, DatabaseClient};
use derive_more::{Display, Error};
use serde::Deserialize;
use std::fmt::{Debug, Formatter};

/// Name of the header (or gRPC metadata entry) that carries the tenant
/// identifier unless configured otherwise.
pub const DEFAULT_TENANT_HEADER: &str = "x-tenant-id";

/// Whether requests are split between tenants.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Tenancy {
    /// Every request shares one client. If a datasource is given, the client
    /// connects to it as-is, otherwise the client's own default is used.
    Single {
        /// Datasource override for the shared client.
        datasource: Option<String>,
    },
    /// Every tenant gets its own client, connected to a datasource derived
    /// from this one.
    Multi {
        /// The base datasource tenant datasources are derived from.
        datasource: String,
    },
}

impl Tenancy {
    /// Whether tenants are read from incoming requests.
    #[must_use]
    pub fn is_multi(&self) -> bool {
        matches!(self, Tenancy::Multi { .. })
    }
}

impl Default for Tenancy {
    fn default() -> Self {
        Tenancy::Single { datasource: None }
    }
}

/// Configuration of a tenant-aware client provider.
///
/// ```
/// # use async_trait::async_trait;
/// # use std::convert::Infallible;
/// # use tenant_injector::{ClientOptions, DatabaseClient};
/// use tenant_injector::{ClientConfig, PluginConfig};
///
/// # struct Client;
/// # #[async_trait]
/// # impl DatabaseClient for Client {
/// #     type Options = ();
/// #     type Error = Infallible;
/// #     fn new(_: ClientOptions<()>) -> Result<Self, Infallible> { Ok(Client) }
/// #     async fn connect(&self) -> Result<(), Infallible> { Ok(()) }
/// #     async fn disconnect(&self) -> Result<(), Infallible> { Ok(()) }
/// # }
/// let config = PluginConfig::new("USERS", ClientConfig::<Client>::default())
///     .multitenant("postgresql://app:secret@db:5432")
///     .with_logging(true);
///
/// assert!(config.tenancy.is_multi());
/// assert_eq!("x-tenant-id", config.tenant_header);
/// ```
pub struct PluginConfig<C: DatabaseClient> {
    /// Token the provider is registered under. Also prefixes its log events.
    pub name: String,
    /// Whether informational events are logged.
    pub logging: bool,
    /// How requests map to clients.
    pub tenancy: Tenancy,
    /// How clients are constructed.
    pub client: ClientConfig<C>,
    /// Header (or gRPC metadata entry) the tenant identifier is read from.
    pub tenant_header: String,
}

impl<C: DatabaseClient> PluginConfig<C> {
    /// Creates a single-tenant configuration with logging disabled.
    #[must_use]
    pub fn new(name: impl Into<String>, client: ClientConfig<C>) -> Self {
        PluginConfig {
            name: name.into(),
            logging: false,
            tenancy: Tenancy::default(),
            client,
            tenant_header: DEFAULT_TENANT_HEADER.to_owned(),
        }
    }

    /// Gives every tenant its own client, derived from `datasource`.
    #[must_use]
    pub fn multitenant(mut self, datasource: impl Into<String>) -> Self {
        self.tenancy = Tenancy::Multi {
            datasource: datasource.into(),
        };
        self
    }

    /// Sets how requests map to clients.
    #[must_use]
    pub fn with_tenancy(mut self, tenancy: Tenancy) -> Self {
        self.tenancy = tenancy;
        self
    }

    /// Enables or disables informational log events.
    #[must_use]
    pub fn with_logging(mut self, logging: bool) -> Self {
        self.logging = logging;
        self
    }

    /// Reads the tenant identifier from a different header.
    #[must_use]
    pub fn with_tenant_header(mut self, header: impl Into<String>) -> Self {
        self.tenant_header = header.into();
        self
    }
}

impl<C> Debug for PluginConfig<C>
where
    C: DatabaseClient,
    C::Options: Debug,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginConfig")
            .field("name", &self.name)
            .field("logging", &self.logging)
            .field("tenancy", &self.tenancy)
            .field("client", &self.client)
            .field("tenant_header", &self.tenant_header)
            .finish()
    }
}

/// The serializable part of a [`PluginConfig`], as found in configuration
/// files.
///
/// ```
/// use tenant_injector::{PluginSettings, Tenancy};
///
/// let settings: PluginSettings = serde_json::from_str(
///     r#"{
///         "name": "USERS",
///         "multitenancy": true,
///         "datasource": "mysql://app:secret@db:3306"
///     }"#,
/// )
/// .unwrap();
///
/// assert_eq!(
///     Tenancy::Multi { datasource: "mysql://app:secret@db:3306".into() },
///     settings.tenancy().unwrap(),
/// );
/// ```
#[derive(Clone, PartialEq, Eq, Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PluginSettings {
    /// Token the provider is registered under.
    pub name: String,
    /// Whether informational events are logged.
    #[serde(default)]
    pub logging: bool,
    /// Whether every tenant gets its own client.
    #[serde(default)]
    pub multitenancy: bool,
    /// The base datasource.
    #[serde(default)]
    pub datasource: Option<String>,
    /// Header the tenant identifier is read from.
    #[serde(default = "default_tenant_header")]
    pub tenant_header: String,
}

fn default_tenant_header() -> String {
    DEFAULT_TENANT_HEADER.to_owned()
}

/// An error in the provider's settings.
#[derive(Debug, Display, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Multitenancy was enabled without a datasource to derive tenant
    /// datasources from.
    #[display(fmt = "<{}> | multitenancy requires a datasource", name)]
    MissingDatasource {
        /// Name of the misconfigured provider.
        name: String,
    },
}

impl PluginSettings {
    /// The tenancy described by these settings.
    pub fn tenancy(&self) -> Result<Tenancy, ConfigError> {
        match (self.multitenancy, &self.datasource) {
            (true, Some(datasource)) => Ok(Tenancy::Multi {
                datasource: datasource.clone(),
            }),
            (true, None) => Err(ConfigError::MissingDatasource {
                name: self.name.clone(),
            }),
            (false, datasource) => Ok(Tenancy::Single {
                datasource: datasource.clone(),
            }),
        }
    }

    /// Combines these settings with the client configuration.
    pub fn into_config<C: DatabaseClient>(
        self,
        client: ClientConfig<C>,
    ) -> Result<PluginConfig<C>, ConfigError> {
        let tenancy = self.tenancy()?;
        Ok(PluginConfig::new(self.name, client)
            .with_tenancy(tenancy)
            .with_logging(self.logging)
            .with_tenant_header(self.tenant_header))
    }
}
