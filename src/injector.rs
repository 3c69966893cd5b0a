use crate::{
    InjectError, InjectResult, InjectorBuilder, Provider, Request,
    RequestInfo, Service, ServiceInfo, Svc,
};
use futures_util::future::join_all;
use std::{
    collections::HashMap,
    fmt::{Debug, Formatter},
};

pub(crate) type ProviderMap = HashMap<ServiceInfo, Vec<Svc<dyn Provider>>>;

/// A runtime dependency injection container. This holds all the bindings
/// between service types and their providers.
///
/// Cloning the injector does not clone the providers inside of it. Instead,
/// both injectors will use the same providers, so the injector can be handed
/// to every worker of a web server and each incoming request resolves its
/// services through the same set of providers.
#[derive(Clone, Default)]
pub struct Injector {
    providers: Svc<ProviderMap>,
}

impl Injector {
    /// Creates a builder for this injector. This is the preferred way of
    /// creating an injector.
    #[must_use]
    pub fn builder() -> InjectorBuilder {
        InjectorBuilder::default()
    }

    pub(crate) fn new_from_parts(providers: ProviderMap) -> Self {
        Injector {
            providers: Svc::new(providers),
        }
    }

    /// Performs a request for a service outside of any incoming request.
    /// Request-scoped providers see no request metadata.
    ///
    /// See the [documentation for `Request`](Request) for more information on
    /// what can be requested.
    pub async fn get<R: Request>(&self) -> InjectResult<R> {
        R::request(self, &RequestInfo::new()).await
    }

    /// Performs a request for a service on behalf of an active request.
    pub async fn get_with<R: Request>(
        &self,
        request_info: &RequestInfo,
    ) -> InjectResult<R> {
        R::request(self, request_info).await
    }

    /// Requests a service from the provider registered under the given token.
    /// Use this when several providers are registered for the same type.
    ///
    /// ```
    /// use tenant_injector::{
    ///     DynSvc, InjectResult, Injector, Provider, RequestInfo, ServiceInfo,
    ///     Svc,
    /// };
    ///
    /// struct Named(&'static str);
    ///
    /// #[async_trait::async_trait]
    /// impl Provider for Named {
    ///     fn result(&self) -> ServiceInfo {
    ///         ServiceInfo::of::<String>()
    ///     }
    ///
    ///     fn token(&self) -> &str {
    ///         self.0
    ///     }
    ///
    ///     async fn provide(
    ///         &self,
    ///         _injector: &Injector,
    ///         _request_info: &RequestInfo,
    ///     ) -> InjectResult<DynSvc> {
    ///         Ok(Svc::new(self.0.to_uppercase()))
    ///     }
    /// }
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let mut builder = Injector::builder();
    /// builder.provide(Named("users"));
    /// builder.provide(Named("orders"));
    ///
    /// let injector = builder.build();
    /// let info = RequestInfo::new();
    /// let orders: Svc<String> =
    ///     injector.get_named("orders", &info).await.unwrap();
    /// assert_eq!("ORDERS", orders.as_str());
    /// assert!(injector.get::<Svc<String>>().await.is_err());
    /// # }
    /// ```
    pub async fn get_named<S: Service>(
        &self,
        name: &str,
        request_info: &RequestInfo,
    ) -> InjectResult<Svc<S>> {
        let service_info = ServiceInfo::of::<S>();
        let provider = self
            .providers_of(service_info)
            .iter()
            .find(|provider| provider.token() == name)
            .ok_or_else(|| InjectError::MissingNamedProvider {
                service_info,
                name: name.to_owned(),
            })?;

        self.activate(provider.as_ref(), request_info).await
    }

    /// Runs the shutdown hook of every registered provider and waits for all
    /// of them to finish.
    pub async fn shutdown(&self) {
        join_all(
            self.providers
                .values()
                .flatten()
                .map(|provider| provider.shutdown()),
        )
        .await;
    }

    pub(crate) fn providers_of(
        &self,
        service_info: ServiceInfo,
    ) -> &[Svc<dyn Provider>] {
        self.providers
            .get(&service_info)
            .map_or(&[][..], Vec::as_slice)
    }

    pub(crate) async fn activate<S: Service>(
        &self,
        provider: &dyn Provider,
        request_info: &RequestInfo,
    ) -> InjectResult<Svc<S>> {
        let service_info = ServiceInfo::of::<S>();
        provider
            .provide(self, request_info)
            .await?
            .downcast()
            .map_err(|_| InjectError::InvalidProvider { service_info })
    }
}

impl Debug for Injector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.providers.iter().map(|(service_info, providers)| {
                let tokens: Vec<&str> =
                    providers.iter().map(|provider| provider.token()).collect();
                (service_info.name(), tokens)
            }))
            .finish()
    }
}
