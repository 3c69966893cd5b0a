use crate::{
    DynSvc, InjectResult, Injector, Provider, RequestInfo, Service,
    ServiceInfo, Svc,
};
use async_trait::async_trait;

/// A provider which returns a constant, predetermined value. Note that this is
/// technically a singleton service in that it does not recreate the value each
/// time it is requested.
pub struct ConstantProvider<R>
where
    R: Service,
{
    result: Svc<R>,
}

impl<R> ConstantProvider<R>
where
    R: Service,
{
    /// Creates a new [`ConstantProvider`] using a predetermined value.
    #[must_use]
    pub fn new(value: R) -> Self {
        ConstantProvider {
            result: Svc::new(value),
        }
    }
}

#[async_trait]
impl<R> Provider for ConstantProvider<R>
where
    R: Service,
{
    fn result(&self) -> ServiceInfo {
        ServiceInfo::of::<R>()
    }

    async fn provide(
        &self,
        _injector: &Injector,
        _request_info: &RequestInfo,
    ) -> InjectResult<DynSvc> {
        Ok(self.result.clone() as DynSvc)
    }
}

impl<T: Service> From<T> for ConstantProvider<T> {
    fn from(value: T) -> Self {
        constant(value)
    }
}

/// Create a provider from a constant value. While the service itself will
/// never be exposed through a mutable reference, if it supports interior
/// mutability, its fields still can be mutated.
///
/// ## Example
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
/// let value1: Svc<i32> = injector.get().await.unwrap();
/// let value2: Svc<i32> = injector.get().await.unwrap();
///
/// assert_eq!(8, *value1);
/// assert!(Svc::ptr_eq(&value1, &value2));
/// # }
/// ```
pub fn constant<T: Service>(value: T) -> ConstantProvider<T> {
    ConstantProvider::new(value)
}
