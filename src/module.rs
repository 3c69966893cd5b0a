use crate::{Provider, ProviderMap, Svc};

/// A collection of providers that can be added all at once to an
/// [`InjectorBuilder`](crate::InjectorBuilder). Modules can be used to group
/// together related services and configure the injector in pieces rather than
/// all at once.
///
/// For creating a module easily via a domain specific language, see
/// [`define_module!`].
#[derive(Default)]
pub struct Module {
    pub(crate) providers: ProviderMap,
}

impl Module {
    /// Assigns the provider for a service type. Multiple providers can be
    /// registered for a service.
    pub fn provide<P: Provider>(&mut self, provider: P) {
        self.providers
            .entry(provider.result())
            .or_default()
            .push(Svc::new(provider));
    }

    /// Iterates the tokens of every provider in this module.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.providers.values().flatten().map(|provider| provider.token())
    }
}

/// Defines a new module using a domain specific language.
///
/// ## Example
///
/// ```
/// use tenant_injector::{constant, define_module, Injector, Svc};
///
/// let module = define_module! {
///     services = [
///         constant(12i32),
///         constant("hello"),
///     ],
///
///     // If there are multiple service definitions, they are merged together.
///     // This means we can have providers registered only in certain
///     // environments.
///     #[cfg(test)]
///     services = [
///         constant(1.5f32),
///     ],
/// };
///
/// let mut builder = Injector::builder();
/// builder.add_module(module);
///
/// let injector = builder.build();
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let value: Svc<i32> = injector.get().await.unwrap();
/// assert_eq!(12, *value);
/// # });
/// ```
#[macro_export]
macro_rules! define_module {
    {
        $(
            $(#[$($attr:meta),*])*
            $key:ident = $value:tt
        ),*
        $(,)?
    } => {
        {
            #[allow(unused_mut)]
            let mut module = <$crate::Module as ::std::default::Default>::default();
            $(
                $(#[$($attr),*])*
                $crate::define_module!(@provide &mut module, $key = $value);
            )*
            module
        }
    };
    (
        @provide $module:expr,
        services = [
            $($service:expr),*
            $(,)?
        ]
    ) => {
        $($module.provide($service);)*
    };
}
