use crate::{
    logger::Logger, ClientConfig, DatabaseClient, DatabaseProvider,
    PluginConfig, Svc, Tenancy, TenantError,
};
use futures_util::future::join_all;
use parking_lot::Mutex;
use std::{
    collections::HashMap,
    fmt::{Debug, Formatter},
    sync::Arc,
};
use tokio::sync::OnceCell;

type ClientCell<C> = Arc<OnceCell<Svc<C>>>;

/// The clients of every tenant that has been seen so far.
///
/// A tenant's client is constructed the first time it is requested, and is
/// connected before anyone else gets to see it. Concurrent first requests for
/// the same tenant wait on each other, so each tenant only ever gets one
/// client.
pub struct TenantPool<C: DatabaseClient> {
    tenancy: Tenancy,
    client: ClientConfig<C>,
    name: String,
    logger: Logger,
    clients: Mutex<HashMap<String, ClientCell<C>>>,
}

impl<C: DatabaseClient> TenantPool<C> {
    /// Creates an empty pool.
    #[must_use]
    pub fn new(config: &PluginConfig<C>) -> Self {
        TenantPool {
            tenancy: config.tenancy.clone(),
            client: config.client.clone(),
            name: config.name.clone(),
            logger: Logger::new(config.name.clone(), config.logging),
            clients: Mutex::default(),
        }
    }

    /// The datasource the client of `tenant` connects to. Without
    /// multitenancy, this is the configured datasource (if any) regardless of
    /// the tenant.
    ///
    /// File-based datasources cannot be split, so all tenants share them. A
    /// warning is emitted when that happens.
    pub fn tenant_url(&self, tenant: &str) -> Result<Option<String>, TenantError> {
        let datasource = match &self.tenancy {
            Tenancy::Single { datasource } => return Ok(datasource.clone()),
            Tenancy::Multi { datasource } => datasource,
        };

        let provider = DatabaseProvider::from_datasource(datasource)
            .map_err(|source| self.datasource_error(source))?;
        let Some(provider) = provider.filter(|provider| !provider.is_shared())
        else {
            self.logger.warn(
                tenant,
                "file-based datasources do not support multitenancy, every \
                 tenant shares the same database",
            );
            return Ok(Some(datasource.clone()));
        };

        provider
            .tenant_url(datasource, tenant)
            .map(|url| Some(url.into_owned()))
            .map_err(|source| self.datasource_error(source))
    }

    /// Constructs a new, unconnected client for `tenant`.
    pub fn generate_client(&self, tenant: &str) -> Result<C, TenantError> {
        let datasource_url = self.tenant_url(tenant)?;
        self.client
            .build(datasource_url, tenant)
            .map_err(|source| TenantError::Client {
                name: self.name.clone(),
                tenant: tenant.to_owned(),
                source: Box::new(source),
            })
    }

    /// Gets the connected client of `tenant`, creating it if needed.
    ///
    /// Failures are not remembered. The next request for the tenant tries to
    /// create the client again, on the same slot, so requests that were
    /// waiting on a failed attempt still end up with the tenant's one client.
    pub async fn get_connection(
        &self,
        tenant: &str,
    ) -> Result<Svc<C>, TenantError> {
        let cell = self
            .clients
            .lock()
            .entry(tenant.to_owned())
            .or_default()
            .clone();

        if let Some(client) = cell.get() {
            self.logger.info(tenant, "reusing client");
            return Ok(client.clone());
        }

        cell.get_or_try_init(|| self.connect(tenant))
            .await
            .cloned()
    }

    /// The tenants that currently have a connected client.
    #[must_use]
    pub fn tenants(&self) -> Vec<String> {
        self.clients
            .lock()
            .iter()
            .filter(|(_, cell)| cell.initialized())
            .map(|(tenant, _)| tenant.clone())
            .collect()
    }

    /// Disconnects every client and removes it from the pool. This waits for
    /// all clients to finish disconnecting. Failures are logged and otherwise
    /// ignored.
    ///
    /// Clients that are still connecting stay in the pool and are
    /// disconnected by the next shutdown.
    pub async fn shutdown(&self) {
        let mut clients: Vec<(String, Svc<C>)> = Vec::new();
        self.clients.lock().retain(|tenant, cell| match cell.get() {
            Some(client) => {
                clients.push((tenant.clone(), client.clone()));
                false
            }
            None => true,
        });

        join_all(clients.iter().map(|(tenant, client)| async move {
            self.logger.info(tenant, "disconnecting client");
            if let Err(error) = client.disconnect().await {
                self.logger.warn(
                    tenant,
                    format_args!("failed to disconnect client: {error}"),
                );
            }
        }))
        .await;
    }

    async fn connect(&self, tenant: &str) -> Result<Svc<C>, TenantError> {
        self.logger.info(tenant, "creating client");
        let client = self.generate_client(tenant)?;
        client
            .connect()
            .await
            .map_err(|source| TenantError::Connect {
                name: self.name.clone(),
                tenant: tenant.to_owned(),
                source: Box::new(source),
            })?;

        Ok(Svc::new(client))
    }

    fn datasource_error(&self, source: crate::DatasourceError) -> TenantError {
        TenantError::Datasource {
            name: self.name.clone(),
            source,
        }
    }
}

impl<C: DatabaseClient> Debug for TenantPool<C> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantPool")
            .field("name", &self.name)
            .field("tenancy", &self.tenancy)
            .field("tenants", &self.tenants())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        tests::{MockClient, MockOptions},
        DatasourceError,
    };
    use std::sync::atomic::Ordering;
    use tracing_test::traced_test;

    fn pool(tenancy: Tenancy, options: MockOptions) -> TenantPool<MockClient> {
        let config =
            PluginConfig::new("USERS", ClientConfig::<MockClient>::new(options))
                .with_tenancy(tenancy)
            .with_logging(true);
        TenantPool::new(&config)
    }

    fn multi(datasource: &str) -> Tenancy {
        Tenancy::Multi {
            datasource: datasource.to_owned(),
        }
    }

    #[tokio::test]
    async fn same_tenant_gets_same_client() {
        let options = MockOptions::default();
        let pool = pool(multi("mysql://HOST:999"), options.clone());

        let first = pool.get_connection("acme").await.unwrap();
        let second = pool.get_connection("acme").await.unwrap();

        assert!(Svc::ptr_eq(&first, &second));
        assert_eq!(1, options.counters.created.load(Ordering::SeqCst));
        assert_eq!(1, options.counters.connected.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn tenants_get_their_own_datasource() {
        let pool = pool(multi("mysql://HOST:999"), MockOptions::default());

        let acme = pool.get_connection("acme").await.unwrap();
        let globex = pool.get_connection("globex").await.unwrap();

        assert!(!Svc::ptr_eq(&acme, &globex));
        assert_eq!(
            Some("mysql://HOST:999/acme"),
            acme.options.datasource_url.as_deref()
        );
        assert_eq!(
            Some("mysql://HOST:999/globex"),
            globex.options.datasource_url.as_deref()
        );

        let mut tenants = pool.tenants();
        tenants.sort();
        assert_eq!(vec!["acme", "globex"], tenants);
    }

    #[tokio::test]
    async fn concurrent_first_requests_create_one_client() {
        let options = MockOptions::default();
        let pool = pool(multi("postgresql://HOST:999"), options.clone());

        let (first, second) = tokio::join!(
            pool.get_connection("acme"),
            pool.get_connection("acme")
        );

        assert!(Svc::ptr_eq(&first.unwrap(), &second.unwrap()));
        assert_eq!(1, options.counters.created.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn single_tenant_passes_datasource_through() {
        let pool = pool(
            Tenancy::Single {
                datasource: Some("mysql://HOST:999".to_owned()),
            },
            MockOptions::default(),
        );

        let client = pool.generate_client("acme").unwrap();
        assert_eq!(
            Some("mysql://HOST:999"),
            client.options.datasource_url.as_deref()
        );
    }

    #[tokio::test]
    async fn single_tenant_without_datasource_keeps_client_default() {
        let pool = pool(Tenancy::default(), MockOptions::default());

        let client = pool.generate_client("default").unwrap();
        assert_eq!(None, client.options.datasource_url);
    }

    #[tokio::test]
    async fn initializer_sees_tenant() {
        let config = PluginConfig::new(
            "USERS",
            ClientConfig::<MockClient>::default().with_initializer(
                |mut client: MockClient, tenant: &str| {
                    client.tenant = Some(tenant.to_owned());
                    client
                },
            ),
        )
        .multitenant("mongodb://HOST:999");
        let pool = TenantPool::new(&config);

        let client = pool.get_connection("acme").await.unwrap();
        assert_eq!(Some("acme"), client.tenant.as_deref());
    }

    #[test]
    #[traced_test]
    fn file_datasource_is_shared_with_warning() {
        let pool = pool(multi("file:./dev.db"), MockOptions::default());

        let url = pool.tenant_url("acme").unwrap();
        assert_eq!(Some("file:./dev.db".to_owned()), url);
        assert!(logs_contain("file-based datasources do not support"));
    }

    #[test]
    fn unsupported_protocol_fails() {
        let pool = pool(multi("invalid://HOST:999"), MockOptions::default());

        match pool.tenant_url("acme") {
            Err(TenantError::Datasource {
                source: DatasourceError::UnsupportedProvider { protocol },
                ..
            }) => assert_eq!("invalid", protocol),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_connect_is_not_cached() {
        let options = MockOptions {
            fail_connect: true,
            ..MockOptions::default()
        };
        let pool = pool(multi("mysql://HOST:999"), options.clone());

        let first = pool.get_connection("acme").await;
        let second = pool.get_connection("acme").await;

        assert!(matches!(first, Err(TenantError::Connect { .. })));
        assert!(matches!(second, Err(TenantError::Connect { .. })));
        assert_eq!(2, options.counters.created.load(Ordering::SeqCst));
        assert!(pool.tenants().is_empty());
    }

    #[tokio::test]
    async fn waiter_on_failed_connect_keeps_tenant_client() {
        let options = MockOptions {
            fail_first_connects: 1,
            ..MockOptions::default()
        };
        let pool = pool(multi("mysql://HOST:999"), options.clone());

        let (first, second) = tokio::join!(
            pool.get_connection("acme"),
            pool.get_connection("acme")
        );
        assert!(matches!(first, Err(TenantError::Connect { .. })));
        let second = second.unwrap();
        assert_eq!(vec!["acme"], pool.tenants());

        let third = pool.get_connection("acme").await.unwrap();
        assert!(Svc::ptr_eq(&second, &third));

        pool.shutdown().await;
        assert_eq!(2, options.counters.connect_attempts.load(Ordering::SeqCst));
        assert_eq!(1, options.counters.disconnected.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn client_connecting_during_shutdown_is_kept() {
        let options = MockOptions::default();
        let pool = pool(multi("mysql://HOST:999"), options.clone());

        let (client, ()) =
            tokio::join!(pool.get_connection("acme"), pool.shutdown());
        let client = client.unwrap();
        assert_eq!(0, options.counters.disconnected.load(Ordering::SeqCst));
        assert_eq!(vec!["acme"], pool.tenants());

        let reused = pool.get_connection("acme").await.unwrap();
        assert!(Svc::ptr_eq(&client, &reused));

        pool.shutdown().await;
        assert_eq!(1, options.counters.disconnected.load(Ordering::SeqCst));
        assert!(pool.tenants().is_empty());
    }

    #[tokio::test]
    async fn failed_construction_is_reported() {
        let options = MockOptions {
            fail_new: true,
            ..MockOptions::default()
        };
        let pool = pool(multi("mysql://HOST:999"), options.clone());

        let result = pool.get_connection("acme").await;
        assert!(matches!(result, Err(TenantError::Client { .. })));
        assert_eq!(0, options.counters.connected.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn shutdown_disconnects_every_client() {
        let options = MockOptions::default();
        let pool = pool(multi("mysql://HOST:999"), options.clone());
        pool.get_connection("acme").await.unwrap();
        pool.get_connection("globex").await.unwrap();

        pool.shutdown().await;

        assert_eq!(2, options.counters.disconnected.load(Ordering::SeqCst));
        assert!(pool.tenants().is_empty());
    }

    #[tokio::test]
    #[traced_test]
    async fn failed_disconnect_is_logged() {
        let options = MockOptions {
            fail_disconnect: true,
            ..MockOptions::default()
        };
        let pool = pool(multi("mysql://HOST:999"), options.clone());
        pool.get_connection("acme").await.unwrap();

        pool.shutdown().await;

        assert!(logs_contain("failed to disconnect client"));
        assert!(pool.tenants().is_empty());
    }

    #[tokio::test]
    #[traced_test]
    async fn creation_and_reuse_are_logged() {
        let pool = pool(multi("mysql://HOST:999"), MockOptions::default());
        pool.get_connection("acme").await.unwrap();
        pool.get_connection("acme").await.unwrap();

        assert!(logs_contain("creating client"));
        assert!(logs_contain("reusing client"));
    }
}
