use crate::{Injector, Module, Provider, ProviderMap, Svc};

/// A builder for an [`Injector`].
#[derive(Default)]
pub struct InjectorBuilder {
    providers: ProviderMap,
}

impl InjectorBuilder {
    /// Assigns the provider for a service type. Multiple providers can be
    /// registered for a service.
    pub fn provide<P: Provider>(&mut self, provider: P) {
        self.add_provider(Svc::new(provider));
    }

    /// Adds a provider to the injector.
    pub fn add_provider(&mut self, provider: Svc<dyn Provider>) {
        self.providers
            .entry(provider.result())
            .or_default()
            .push(provider);
    }

    /// Adds all the providers registered in a module. This may cause multiple
    /// providers to be registered for the same service.
    pub fn add_module(&mut self, module: Module) {
        for (result, mut module_providers) in module.providers {
            self.providers
                .entry(result)
                .or_default()
                .append(&mut module_providers);
        }
    }

    /// Builds the injector.
    #[must_use]
    pub fn build(self) -> Injector {
        Injector::new_from_parts(self.providers)
    }
}
