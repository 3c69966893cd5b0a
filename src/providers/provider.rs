use crate::{DynSvc, InjectResult, Injector, RequestInfo, Service, ServiceInfo};
use async_trait::async_trait;

/// Weakly typed service provider. Given an injector and the active request,
/// this will provide an implementation of a service.
///
/// Providers are shared between every request resolved through the same
/// [`Injector`], so any state they keep must use interior mutability.
///
/// ## Example
///
/// ```
/// use async_trait::async_trait;
/// use tenant_injector::{
///     DynSvc, InjectResult, Injector, Provider, RequestInfo, ServiceInfo, Svc,
/// };
///
/// struct Foo(bool);
///
/// struct FooProvider;
///
/// #[async_trait]
/// impl Provider for FooProvider {
///     fn result(&self) -> ServiceInfo {
///         ServiceInfo::of::<Foo>()
///     }
///
///     async fn provide(
///         &self,
///         _injector: &Injector,
///         request_info: &RequestInfo,
///     ) -> InjectResult<DynSvc> {
///         Ok(Svc::new(Foo(request_info.metadata().is_some())))
///     }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let mut builder = Injector::builder();
/// builder.provide(FooProvider);
///
/// let injector = builder.build();
/// let foo: Svc<Foo> = injector.get().await.unwrap();
/// assert!(!foo.0);
/// # }
/// ```
#[async_trait]
pub trait Provider: Service {
    /// The [`ServiceInfo`] which describes the type returned by this provider.
    fn result(&self) -> ServiceInfo;

    /// The token this provider is registered under. Defaults to the name of
    /// the provided type.
    fn token(&self) -> &str {
        self.result().name()
    }

    /// Provides an instance of the service.
    async fn provide(
        &self,
        injector: &Injector,
        request_info: &RequestInfo,
    ) -> InjectResult<DynSvc>;

    /// Releases whatever the provider holds on to. Called once when the
    /// injector shuts down.
    async fn shutdown(&self) {}
}
