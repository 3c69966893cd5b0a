use std::{
    any::{Any, TypeId},
    error::Error,
    fmt::{Display, Formatter},
    sync::Arc,
};

/// A reference-counted pointer holding a service. Services are shared between
/// concurrently handled requests, so this is always a thread-safe pointer.
pub type Svc<T> = Arc<T>;

/// A reference-counted service pointer holding an instance of `dyn Any`.
pub type DynSvc = Arc<dyn Any + Send + Sync>;

/// A result from attempting to inject dependencies into a service and
/// construct an instance of it.
pub type InjectResult<T> = Result<T, InjectError>;

/// Implemented automatically on types that are capable of being a service.
pub trait Service: Any + Send + Sync {}
impl<T: ?Sized + Any + Send + Sync> Service for T {}

/// Type information about a service.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub struct ServiceInfo {
    id: TypeId,
    name: &'static str,
}

impl ServiceInfo {
    /// Creates a [`ServiceInfo`] for the given type.
    #[must_use]
    pub fn of<T: ?Sized + Any>() -> Self {
        ServiceInfo {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Gets the [`TypeId`] for this service.
    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Gets the type name of this service.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// An error that has occurred during creation of a service.
#[derive(Debug)]
#[non_exhaustive]
pub enum InjectError {
    /// Failed to find a provider for the requested type.
    MissingProvider {
        /// The service that was requested.
        service_info: ServiceInfo,
    },

    /// None of the providers for the requested type is registered under the
    /// requested name.
    MissingNamedProvider {
        /// The service that was requested.
        service_info: ServiceInfo,
        /// The token the provider was requested with.
        name: String,
    },

    /// There are multiple providers for the requested type, but only one was
    /// expected.
    MultipleProviders {
        /// The service that was requested.
        service_info: ServiceInfo,
    },

    /// The registered provider returned the wrong type.
    InvalidProvider {
        /// The service that was requested.
        service_info: ServiceInfo,
    },

    /// An error occurred during activation of a service.
    ActivationFailed {
        /// The service that was requested.
        service_info: ServiceInfo,
        /// The error that was thrown during service initialization.
        inner: Box<dyn Error + Send + Sync + 'static>,
    },

    /// An unexpected error has occurred. This is usually caused by a bug in
    /// the library itself.
    InternalError(String),
}

impl InjectError {
    /// Tries to downcast the error that caused an activation failure.
    #[must_use]
    pub fn activation_error<E: Error + 'static>(&self) -> Option<&E> {
        match self {
            InjectError::ActivationFailed { inner, .. } => inner.downcast_ref(),
            _ => None,
        }
    }
}

impl Error for InjectError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            InjectError::ActivationFailed { inner, .. } => Some(inner.as_ref()),
            _ => None,
        }
    }
}

impl Display for InjectError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "an error occurred during injection: ")?;
        match self {
            InjectError::MissingProvider { service_info } => {
                write!(f, "{} has no provider", service_info.name())
            }
            InjectError::MissingNamedProvider { service_info, name } => {
                write!(
                    f,
                    "{} has no provider named {:?}",
                    service_info.name(),
                    name
                )
            }
            InjectError::MultipleProviders { service_info } => write!(
                f,
                "{} has multiple providers, but only one was expected",
                service_info.name()
            ),
            InjectError::InvalidProvider { service_info } => write!(
                f,
                "the registered provider for {} returned the wrong type",
                service_info.name()
            ),
            InjectError::ActivationFailed {
                service_info,
                inner,
            } => write!(
                f,
                "an error occurred during activation of {}: {}",
                service_info.name(),
                inner
            ),
            InjectError::InternalError(message) => {
                write!(
                    f,
                    "an unexpected error occurred (please report this): {message}"
                )
            }
        }
    }
}
