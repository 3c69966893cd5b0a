use crate::{
    DatabaseClient, DynSvc, InjectError, InjectResult, Injector, Module,
    PluginConfig, Provider, RequestInfo, RequestMetadata, ServiceInfo,
    TenantError, TenantPool,
};
use async_trait::async_trait;

/// The tenant every request belongs to when multitenancy is disabled.
pub const DEFAULT_TENANT: &str = "default";

/// Reads the tenant identifier from the metadata of a request.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct TenantResolver {
    name: String,
    multitenancy: bool,
    header: String,
}

impl TenantResolver {
    /// Creates a resolver for the provider described by `config`.
    #[must_use]
    pub fn new<C: DatabaseClient>(config: &PluginConfig<C>) -> Self {
        TenantResolver {
            name: config.name.clone(),
            multitenancy: config.tenancy.is_multi(),
            header: config.tenant_header.to_ascii_lowercase(),
        }
    }

    /// Determines the tenant of a request.
    ///
    /// Without multitenancy every request belongs to [`DEFAULT_TENANT`].
    /// Otherwise, the tenant is read from the configured header (for HTTP
    /// requests) or metadata entry (for gRPC requests), and requests which
    /// don't have one are rejected.
    pub fn resolve<'a>(
        &self,
        metadata: Option<&'a RequestMetadata>,
    ) -> Result<&'a str, TenantError> {
        if !self.multitenancy {
            return Ok(DEFAULT_TENANT);
        }

        metadata
            .and_then(|metadata| metadata.get(&self.header))
            .filter(|tenant| !tenant.is_empty())
            .ok_or_else(|| TenantError::MissingTenant {
                name: self.name.clone(),
                header: self.header.clone(),
            })
    }
}

/// Provides the client of the tenant that made the active request.
pub struct ConnectionProvider<C: DatabaseClient> {
    name: String,
    resolver: TenantResolver,
    pool: TenantPool<C>,
}

impl<C: DatabaseClient> ConnectionProvider<C> {
    /// Creates a provider with an empty pool of clients.
    #[must_use]
    pub fn new(config: &PluginConfig<C>) -> Self {
        ConnectionProvider {
            name: config.name.clone(),
            resolver: TenantResolver::new(config),
            pool: TenantPool::new(config),
        }
    }

    /// The clients this provider has handed out.
    #[must_use]
    pub fn pool(&self) -> &TenantPool<C> {
        &self.pool
    }

    async fn connection(
        &self,
        request_info: &RequestInfo,
    ) -> Result<DynSvc, TenantError> {
        let tenant = self.resolver.resolve(request_info.metadata())?;
        let client = self.pool.get_connection(tenant).await?;
        Ok(client as DynSvc)
    }
}

#[async_trait]
impl<C: DatabaseClient> Provider for ConnectionProvider<C> {
    fn result(&self) -> ServiceInfo {
        ServiceInfo::of::<C>()
    }

    fn token(&self) -> &str {
        &self.name
    }

    async fn provide(
        &self,
        _injector: &Injector,
        request_info: &RequestInfo,
    ) -> InjectResult<DynSvc> {
        self.connection(request_info).await.map_err(|error| {
            InjectError::ActivationFailed {
                service_info: self.result(),
                inner: Box::new(error),
            }
        })
    }

    async fn shutdown(&self) {
        self.pool.shutdown().await;
    }
}

/// Registers tenant-aware database clients with an injector.
///
/// ```
/// # use async_trait::async_trait;
/// # use std::convert::Infallible;
/// use http::HeaderMap;
/// use tenant_injector::{
///     ClientConfig, ClientOptions, DatabaseClient, Injector, PluginConfig,
///     RequestInfo, Svc, TenantModule,
/// };
///
/// struct Client {
///     datasource_url: Option<String>,
/// }
///
/// # #[async_trait]
/// impl DatabaseClient for Client {
///     type Options = ();
///     type Error = Infallible;
///
///     fn new(options: ClientOptions<()>) -> Result<Self, Infallible> {
///         Ok(Client {
///             datasource_url: options.datasource_url,
///         })
///     }
///     # async fn connect(&self) -> Result<(), Infallible> { Ok(()) }
///     # async fn disconnect(&self) -> Result<(), Infallible> { Ok(()) }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let config = PluginConfig::new("USERS", ClientConfig::<Client>::default())
///     .multitenant("postgresql://app:secret@db:5432");
///
/// let mut builder = Injector::builder();
/// builder.add_module(TenantModule::register(config));
/// let injector = builder.build();
///
/// let mut headers = HeaderMap::new();
/// headers.insert("x-tenant-id", "acme".parse().unwrap());
/// let info = RequestInfo::new().with_metadata(headers);
///
/// let client: Svc<Client> = injector.get_with(&info).await.unwrap();
/// assert_eq!(
///     Some("postgresql://app:secret@db:5432/acme"),
///     client.datasource_url.as_deref(),
/// );
///
/// injector.shutdown().await;
/// # }
/// ```
#[derive(Clone, Copy, Debug)]
pub struct TenantModule;

impl TenantModule {
    /// Creates a module holding a single [`ConnectionProvider`], registered
    /// under the configured name.
    #[must_use]
    pub fn register<C: DatabaseClient>(config: PluginConfig<C>) -> Module {
        let mut module = Module::default();
        module.provide(ConnectionProvider::new(&config));
        module
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{tests::MockClient, ClientConfig, DEFAULT_TENANT_HEADER};
    use http::HeaderMap;
    use tonic::metadata::{AsciiMetadataValue, MetadataMap};

    fn resolver(multitenancy: bool) -> TenantResolver {
        let config =
            PluginConfig::new("USERS", ClientConfig::<MockClient>::default());
        let config = if multitenancy {
            config.multitenant("mysql://HOST:999")
        } else {
            config
        };
        TenantResolver::new(&config)
    }

    fn http_metadata(tenant: &'static str) -> RequestMetadata {
        let mut headers = HeaderMap::new();
        headers.insert(DEFAULT_TENANT_HEADER, tenant.parse().unwrap());
        headers.into()
    }

    #[test]
    fn single_tenant_uses_default() {
        let resolver = resolver(false);
        assert_eq!(Ok(DEFAULT_TENANT), resolver.resolve(None).map_err(drop));
        assert_eq!(
            Ok(DEFAULT_TENANT),
            resolver.resolve(Some(&http_metadata("acme"))).map_err(drop)
        );
    }

    #[test]
    fn tenant_is_read_from_header() {
        let metadata = http_metadata("acme");
        assert_eq!(
            Ok("acme"),
            resolver(true).resolve(Some(&metadata)).map_err(drop)
        );
    }

    #[test]
    fn tenant_is_read_from_grpc_metadata() {
        let mut map = MetadataMap::new();
        map.insert(
            DEFAULT_TENANT_HEADER,
            AsciiMetadataValue::from_static("acme"),
        );
        let metadata = RequestMetadata::from(map);

        assert_eq!(
            Ok("acme"),
            resolver(true).resolve(Some(&metadata)).map_err(drop)
        );
    }

    #[test]
    fn missing_tenant_is_client_error() {
        let resolver = resolver(true);
        let empty = RequestMetadata::from(HeaderMap::new());

        for metadata in [None, Some(&empty), Some(&http_metadata(""))] {
            let error = resolver.resolve(metadata).unwrap_err();
            assert!(error.is_client_error());
        }
    }

    #[test]
    fn custom_header_is_case_insensitive() {
        let config =
            PluginConfig::new("USERS", ClientConfig::<MockClient>::default())
                .multitenant("mysql://HOST:999")
                .with_tenant_header("X-Org");
        let resolver = TenantResolver::new(&config);

        let mut headers = HeaderMap::new();
        headers.insert("x-org", "acme".parse().unwrap());
        let metadata = RequestMetadata::from(headers);

        assert_eq!(Ok("acme"), resolver.resolve(Some(&metadata)).map_err(drop));
    }

    #[test]
    fn register_creates_one_named_provider() {
        let config =
            PluginConfig::new("USERS", ClientConfig::<MockClient>::default());
        let module = TenantModule::register(config);

        assert_eq!(vec!["USERS"], module.tokens().collect::<Vec<_>>());
    }
}
