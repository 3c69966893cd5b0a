use std::fmt::Display;

/// Emits the events of a single provider. Every event carries the name of the
/// provider in its `provider` field.
#[derive(Clone, Debug)]
pub(crate) struct Logger {
    name: String,
    active: bool,
}

impl Logger {
    pub fn new(name: impl Into<String>, active: bool) -> Self {
        Logger {
            name: name.into(),
            active,
        }
    }

    /// Informational events are dropped unless logging was enabled.
    pub fn info(&self, tenant: &str, message: impl Display) {
        if self.active {
            tracing::info!(provider = %self.name, tenant, "{message}");
        }
    }

    pub fn warn(&self, tenant: &str, message: impl Display) {
        tracing::warn!(provider = %self.name, tenant, "{message}");
    }
}
