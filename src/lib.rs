//! Request-scoped, per-tenant database clients for runtime dependency
//! injection.
//!
//! Services are resolved at runtime through an [`Injector`]. Providers
//! receive information about the request being handled, which lets a single
//! provider hand out different instances depending on who is asking. This
//! crate uses that to give every tenant of an application its own database
//! client.
//!
//! # Tenancy
//!
//! Each request is mapped to a tenant by reading a header (HTTP) or a
//! metadata entry (gRPC), `x-tenant-id` by default. The first time a tenant
//! is seen, a client is constructed for it and connected. Every request from
//! that tenant afterwards gets the same client back.
//!
//! The connection string of a tenant's client is derived from a base
//! datasource:
//!
//! | Datasource                        | Tenant `acme` connects to                  |
//! |-----------------------------------|--------------------------------------------|
//! | `mysql://user:pass@db:3306`       | `mysql://user:pass@db:3306/acme`           |
//! | `postgresql://user:pass@db:5432`  | `postgresql://user:pass@db:5432/acme`      |
//! | `mongodb://user:pass@db:27017`    | `mongodb://user:pass@db:27017/acme`        |
//! | `sqlserver://user:pass@db:1433`   | `sqlserver://user:pass@db:1433?database=acme` |
//! | `file:./dev.db`                   | `file:./dev.db` (shared by every tenant)   |
//!
//! Without multitenancy every request belongs to the [`DEFAULT_TENANT`], so a
//! single client is shared by the whole application.
//!
//! # Example
//!
//! ```
//! use async_trait::async_trait;
//! use http::HeaderMap;
//! use std::{error::Error, fmt};
//! use tenant_injector::{
//!     ClientConfig, ClientOptions, DatabaseClient, Injector, PluginConfig,
//!     RequestInfo, Svc, TenantModule,
//! };
//!
//! // Stand-in for a generated database client.
//! struct UsersClient {
//!     url: String,
//! }
//!
//! #[derive(Debug)]
//! struct ConnectError;
//!
//! impl fmt::Display for ConnectError {
//!     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
//!         write!(f, "failed to connect")
//!     }
//! }
//!
//! impl Error for ConnectError {}
//!
//! #[async_trait]
//! impl DatabaseClient for UsersClient {
//!     type Options = ();
//!     type Error = ConnectError;
//!
//!     fn new(options: ClientOptions<()>) -> Result<Self, ConnectError> {
//!         options
//!             .datasource_url
//!             .map(|url| UsersClient { url })
//!             .ok_or(ConnectError)
//!     }
//!
//!     async fn connect(&self) -> Result<(), ConnectError> {
//!         Ok(())
//!     }
//!
//!     async fn disconnect(&self) -> Result<(), ConnectError> {
//!         Ok(())
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn Error>> {
//! let config = PluginConfig::new("USERS", ClientConfig::<UsersClient>::default())
//!     .multitenant("mysql://app:secret@db:3306")
//!     .with_logging(true);
//!
//! let mut builder = Injector::builder();
//! builder.add_module(TenantModule::register(config));
//! let injector = builder.build();
//!
//! // Usually done by a web framework integration for each request
//! let mut headers = HeaderMap::new();
//! headers.insert("x-tenant-id", "acme".parse()?);
//! let info = RequestInfo::new().with_metadata(headers);
//!
//! let client: Svc<UsersClient> = injector.get_with(&info).await?;
//! assert_eq!("mysql://app:secret@db:3306/acme", client.url);
//!
//! // Disconnects the clients of every tenant
//! injector.shutdown().await;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::needless_pass_by_value
)]

mod builder;
mod client;
mod config;
mod datasource;
mod error;
mod factory;
mod injector;
mod logger;
mod module;
mod pool;
mod providers;
mod requests;
mod service;

pub use builder::*;
pub use client::*;
pub use config::*;
pub use datasource::*;
pub use error::*;
pub use factory::*;
pub use injector::*;
pub use module::*;
pub use pool::*;
pub use providers::*;
pub use requests::*;
pub use service::*;
