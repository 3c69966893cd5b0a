use crate::Service;
use async_trait::async_trait;
use std::{
    error::Error,
    fmt::{Debug, Formatter},
    sync::Arc,
};

/// Options handed to a database client when it is constructed.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct ClientOptions<O> {
    /// Options configured by the application.
    pub options: O,
    /// The datasource the client should connect to instead of the one it was
    /// generated with. This is only set for multi-tenant providers, or when a
    /// single-tenant provider was given an explicit datasource.
    pub datasource_url: Option<String>,
}

/// A generated database client.
///
/// Each tenant gets its own instance. Instances are constructed lazily the
/// first time a tenant is requested, connected once, and disconnected when
/// the injector shuts down.
#[async_trait]
pub trait DatabaseClient: Service + Sized {
    /// Constructor options for this client, excluding the datasource.
    type Options: Clone + Send + Sync + 'static;

    /// The error returned by this client.
    type Error: Error + Send + Sync + 'static;

    /// Constructs a new, unconnected client.
    fn new(options: ClientOptions<Self::Options>) -> Result<Self, Self::Error>;

    /// Opens the connection to the database.
    async fn connect(&self) -> Result<(), Self::Error>;

    /// Closes the connection to the database.
    async fn disconnect(&self) -> Result<(), Self::Error>;
}

/// Customizes each client right after construction. The identifier of the
/// tenant the client was constructed for is passed alongside it.
pub type Initializer<C> = Arc<dyn Fn(C, &str) -> C + Send + Sync>;

/// How clients are constructed.
///
/// ```
/// # use async_trait::async_trait;
/// # use std::convert::Infallible;
/// use tenant_injector::{ClientConfig, ClientOptions, DatabaseClient};
///
/// struct Client {
///     schema: Option<String>,
/// }
///
/// # #[async_trait]
/// impl DatabaseClient for Client {
///     type Options = ();
///     type Error = Infallible;
///
///     fn new(_options: ClientOptions<()>) -> Result<Self, Infallible> {
///         Ok(Client { schema: None })
///     }
///     # async fn connect(&self) -> Result<(), Infallible> { Ok(()) }
///     # async fn disconnect(&self) -> Result<(), Infallible> { Ok(()) }
/// }
///
/// let config = ClientConfig::<Client>::new(()).with_initializer(
///     |mut client: Client, tenant: &str| {
///         client.schema = Some(format!("tenant_{tenant}"));
///         client
///     },
/// );
/// # let _ = config;
/// ```
pub struct ClientConfig<C: DatabaseClient> {
    pub(crate) options: C::Options,
    pub(crate) initializer: Option<Initializer<C>>,
}

impl<C: DatabaseClient> ClientConfig<C> {
    /// Creates a configuration which constructs clients with the given
    /// options.
    #[must_use]
    pub fn new(options: C::Options) -> Self {
        ClientConfig {
            options,
            initializer: None,
        }
    }

    /// Runs `initializer` on every client after it has been constructed.
    #[must_use]
    pub fn with_initializer<F>(mut self, initializer: F) -> Self
    where
        F: Fn(C, &str) -> C + Send + Sync + 'static,
    {
        self.initializer = Some(Arc::new(initializer));
        self
    }

    /// The options clients are constructed with.
    #[must_use]
    pub fn options(&self) -> &C::Options {
        &self.options
    }

    pub(crate) fn build(
        &self,
        datasource_url: Option<String>,
        tenant: &str,
    ) -> Result<C, C::Error> {
        let client = C::new(ClientOptions {
            options: self.options.clone(),
            datasource_url,
        })?;

        Ok(match &self.initializer {
            Some(initializer) => initializer(client, tenant),
            None => client,
        })
    }
}

impl<C> Default for ClientConfig<C>
where
    C: DatabaseClient,
    C::Options: Default,
{
    fn default() -> Self {
        ClientConfig::new(C::Options::default())
    }
}

impl<C: DatabaseClient> Clone for ClientConfig<C> {
    fn clone(&self) -> Self {
        ClientConfig {
            options: self.options.clone(),
            initializer: self.initializer.clone(),
        }
    }
}

impl<C> Debug for ClientConfig<C>
where
    C: DatabaseClient,
    C::Options: Debug,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("options", &self.options)
            .field("initializer", &self.initializer.is_some())
            .finish()
    }
}
