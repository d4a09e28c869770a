use std::collections::HashMap;
use std::rc::Rc;

use log::{debug, warn};
use serde_json::Value;

use crate::error::BridgeError;
use crate::module::{MethodDescriptor, MethodId, ModuleDescriptor, ModuleId, NativeModule};
use crate::wire::RegistryConfig;

/// Registry of native modules addressable by `(module id, method id)`
///
/// Ids are handed out in registration order starting at 0 and never reused.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: Vec<ModuleDescriptor>,
    names_to_ids: HashMap<String, ModuleId>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a native module, returning its id
    ///
    /// Modules without a name cannot be addressed from the script side and are
    /// skipped. A name collision still yields a distinct id; the later module wins the
    /// name in [`ModuleRegistry::build_config`].
    pub fn register(&mut self, module: Rc<dyn NativeModule>) -> Option<ModuleId> {
        if module.name().is_empty() {
            warn!("A module factory produced a module without a name, skipping it");
            return None;
        }

        let id = self.modules.len();
        let descriptor = ModuleDescriptor::new(id, module);

        if let Some(previous) = self
            .names_to_ids
            .insert(descriptor.name().to_string(), id)
        {
            warn!(
                "Module name \"{}\" already registered with id {previous}, id {id} now owns the name",
                descriptor.name()
            );
        }

        debug!("Added module {} {id}", descriptor.name());
        self.modules.push(descriptor);
        Some(id)
    }

    /// Register modules in order
    pub fn register_all<I>(&mut self, modules: I) -> Vec<ModuleId>
    where
        I: IntoIterator<Item = Rc<dyn NativeModule>>,
    {
        modules
            .into_iter()
            .filter_map(|module| self.register(module))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn module(&self, module_id: ModuleId) -> Option<&ModuleDescriptor> {
        self.modules.get(module_id)
    }

    /// Id currently owning `name`
    pub fn id_of(&self, name: &str) -> Option<ModuleId> {
        self.names_to_ids.get(name).copied()
    }

    /// Modules in id order
    pub fn modules(&self) -> impl Iterator<Item = &ModuleDescriptor> {
        self.modules.iter()
    }

    /// Look up a method by its numeric address
    pub fn resolve(&self, module_id: ModuleId, method_id: MethodId) -> Option<&MethodDescriptor> {
        self.modules.get(module_id)?.method(method_id)
    }

    /// Look up a method by the raw ids found in a batch
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::UnknownTarget`] when either id is not a non-negative integer
    /// or does not name a registered method
    pub fn resolve_raw(
        &self,
        module_id: &Value,
        method_id: &Value,
    ) -> Result<&MethodDescriptor, BridgeError> {
        let index = |value: &Value| value.as_u64().and_then(|v| usize::try_from(v).ok());

        index(module_id)
            .zip(index(method_id))
            .and_then(|(module, method)| self.resolve(module, method))
            .ok_or_else(|| BridgeError::UnknownTarget {
                module_id: module_id.clone(),
                method_id: method_id.clone(),
            })
    }

    /// Configuration payload for the script side, keyed by module name
    pub fn build_config(&self) -> RegistryConfig {
        let mut config = RegistryConfig::default();
        for module in &self.modules {
            config
                .remote_module_config
                .insert(module.name().to_string(), module.info());
        }
        config
    }
}
