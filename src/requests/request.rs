use crate::{
    InjectError, InjectResult, Injector, RequestInfo, Service, ServiceInfo,
    Svc,
};
use async_trait::async_trait;

/// A request to an injector.
///
/// Requests are resolved asynchronously since request-scoped providers may
/// need to open connections before they can hand out their service.
///
/// ```
/// use tenant_injector::{constant, Injector, Svc};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let mut builder = Injector::builder();
/// builder.provide(constant(8i32));
///
/// let injector = builder.build();
/// let value: Svc<i32> = injector.get().await.unwrap();
/// let missing: Option<Svc<u8>> = injector.get().await.unwrap();
/// let all: Vec<Svc<i32>> = injector.get().await.unwrap();
///
/// assert_eq!(8, *value);
/// assert!(missing.is_none());
/// assert_eq!(1, all.len());
/// # }
/// ```
#[async_trait]
pub trait Request: Sized + Send {
    /// Performs the request to the injector.
    async fn request(
        injector: &Injector,
        info: &RequestInfo,
    ) -> InjectResult<Self>;
}

/// Requests the injector used to resolve services.
#[async_trait]
impl Request for Injector {
    async fn request(
        injector: &Injector,
        _info: &RequestInfo,
    ) -> InjectResult<Self> {
        Ok(injector.clone())
    }
}

/// Requests the information about the current request.
#[async_trait]
impl Request for RequestInfo {
    async fn request(
        _injector: &Injector,
        info: &RequestInfo,
    ) -> InjectResult<Self> {
        Ok(info.clone())
    }
}

/// Requests a service pointer to a service. This request fails if there is not
/// exactly one provider of the given service type.
#[async_trait]
impl<S: Service> Request for Svc<S> {
    async fn request(
        injector: &Injector,
        info: &RequestInfo,
    ) -> InjectResult<Self> {
        let service_info = ServiceInfo::of::<S>();
        let provider = match injector.providers_of(service_info) {
            [] => return Err(InjectError::MissingProvider { service_info }),
            [provider] => provider,
            _ => return Err(InjectError::MultipleProviders { service_info }),
        };

        injector.activate(provider.as_ref(), info).await
    }
}

/// Tries to request a service pointer for a service. If no provider has been
/// registered for it, then returns `None`. This fails if there are multiple
/// providers of the given service.
#[async_trait]
impl<S: Service> Request for Option<Svc<S>> {
    async fn request(
        injector: &Injector,
        info: &RequestInfo,
    ) -> InjectResult<Self> {
        match injector.get_with(info).await {
            Ok(response) => Ok(Some(response)),
            Err(InjectError::MissingProvider { .. }) => Ok(None),
            Err(error) => Err(error),
        }
    }
}

/// Requests an instance of a service from every one of its providers. If no
/// provider is registered for the given service, then this returns an empty
/// [`Vec<T>`].
#[async_trait]
impl<S: Service> Request for Vec<Svc<S>> {
    async fn request(
        injector: &Injector,
        info: &RequestInfo,
    ) -> InjectResult<Self> {
        let mut services = Vec::new();
        for provider in injector.providers_of(ServiceInfo::of::<S>()) {
            services.push(injector.activate(provider.as_ref(), info).await?);
        }

        Ok(services)
    }
}
