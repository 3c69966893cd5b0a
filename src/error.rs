use crate::DatasourceError;
use std::{
    error::Error,
    fmt::{Display, Formatter},
};

/// An error raised while resolving the client of a tenant.
///
/// These errors are carried inside of
/// [`InjectError::ActivationFailed`](crate::InjectError::ActivationFailed)
/// when they occur during injection. Use
/// [`InjectError::activation_error`](crate::InjectError::activation_error) to
/// get them back out.
#[derive(Debug)]
#[non_exhaustive]
pub enum TenantError {
    /// Multitenancy is enabled but the request did not identify a tenant.
    MissingTenant {
        /// Name of the provider that was activated.
        name: String,
        /// The header (or metadata entry) the tenant was expected in.
        header: String,
    },

    /// The tenant's datasource could not be derived.
    Datasource {
        /// Name of the provider that was activated.
        name: String,
        /// The reason the datasource could not be derived.
        source: DatasourceError,
    },

    /// The client of a tenant could not be constructed.
    Client {
        /// Name of the provider that was activated.
        name: String,
        /// The tenant the client was constructed for.
        tenant: String,
        /// The error returned by the client.
        source: Box<dyn Error + Send + Sync + 'static>,
    },

    /// The client of a tenant failed to connect.
    Connect {
        /// Name of the provider that was activated.
        name: String,
        /// The tenant the client was connecting for.
        tenant: String,
        /// The error returned by the client.
        source: Box<dyn Error + Send + Sync + 'static>,
    },
}

impl TenantError {
    /// Whether the error was caused by the request rather than by the
    /// server. Web integrations answer these with a 4xx status.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, TenantError::MissingTenant { .. })
    }

    /// Name of the provider that raised this error.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            TenantError::MissingTenant { name, .. }
            | TenantError::Datasource { name, .. }
            | TenantError::Client { name, .. }
            | TenantError::Connect { name, .. } => name,
        }
    }
}

impl Error for TenantError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TenantError::MissingTenant { .. } => None,
            TenantError::Datasource { source, .. } => Some(source),
            TenantError::Client { source, .. }
            | TenantError::Connect { source, .. } => Some(source.as_ref()),
        }
    }
}

impl Display for TenantError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{}> | ", self.name())?;
        match self {
            TenantError::MissingTenant { header, .. } => {
                write!(f, "tenant identifier not found in `{header}`")
            }
            TenantError::Datasource { source, .. } => {
                write!(f, "failed to derive tenant datasource: {source}")
            }
            TenantError::Client { tenant, source, .. } => {
                write!(f, "failed to create client for tenant {tenant}: {source}")
            }
            TenantError::Connect { tenant, source, .. } => {
                write!(f, "failed to connect client for tenant {tenant}: {source}")
            }
        }
    }
}
