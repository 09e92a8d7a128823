use super::auth::{AllowAll, Authorizer};
use super::Dispatcher;
use crate::config::RelayConfig;
use crate::template::{Template, TemplateRegistry};
use crate::transport::{HttpTransport, Transport};
use crate::Result;
use std::sync::Arc;

/// Builder for [`Dispatcher`].
///
/// Without an explicit configuration the builder reads [`RelayConfig::from_env`];
/// without a transport it creates an [`HttpTransport`] from that configuration.
pub struct DispatcherBuilder {
    config: Option<RelayConfig>,
    templates: Option<Arc<TemplateRegistry>>,
    extra_templates: Vec<Template>,
    authorizer: Arc<dyn Authorizer>,
    transport: Option<Arc<dyn Transport>>,
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            templates: None,
            extra_templates: Vec::new(),
            authorizer: Arc::new(AllowAll),
            transport: None,
        }
    }

    pub fn config(mut self, config: RelayConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Share an existing registry; templates from the configuration are added to it.
    pub fn templates(mut self, registry: Arc<TemplateRegistry>) -> Self {
        self.templates = Some(registry);
        self
    }

    pub fn template(mut self, template: Template) -> Self {
        self.extra_templates.push(template);
        self
    }

    pub fn authorizer(mut self, authorizer: impl Authorizer + 'static) -> Self {
        self.authorizer = Arc::new(authorizer);
        self
    }

    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> Result<Dispatcher> {
        let config = match self.config {
            Some(config) => {
                config.validate()?;
                config
            }
            None => RelayConfig::from_env()?,
        };

        let templates = self.templates.unwrap_or_default();
        for template in config.templates.iter().cloned().chain(self.extra_templates) {
            templates.register(template);
        }

        let transport: Arc<dyn Transport> = match self.transport {
            Some(t) => t,
            None => Arc::new(HttpTransport::new(&config.transport_config())?),
        };

        tracing::debug!(
            templates = templates.len(),
            allowed = ?config.allowed_actions,
            "dispatcher ready"
        );

        Ok(Dispatcher {
            config: Arc::new(config),
            templates,
            authorizer: self.authorizer,
            transport,
        })
    }
}
