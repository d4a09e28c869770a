//! Module and method descriptors
//!
//! A native module is anything implementing [`NativeModule`]. The registry wraps each one
//! in a [`ModuleDescriptor`] that fixes its id and its method table for the lifetime of
//! the engine.

use std::rc::Rc;

use indexmap::IndexMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::InvocationError;
use crate::handle::BridgeHandle;
use crate::modules::ViewManager;

/// Module id, assigned in registration order starting at 0
pub type ModuleId = usize;

/// Method id, the index of a method in its module's declaration order
pub type MethodId = usize;

/// Script callback id, assigned by the script side to function arguments
pub type CallbackId = u64;

/// A native capability exposed to the script runtime
pub trait NativeModule {
    /// Name the script side addresses this module by
    fn name(&self) -> &str;

    /// Invokable method names in declaration order
    fn methods(&self) -> &[&'static str];

    /// Constants exported to the script side with the module config
    fn constants(&self) -> Map<String, Value> {
        Map::new()
    }

    /// Called once at registration with a handle back into the engine
    fn set_bridge(&self, bridge: BridgeHandle) {
        let _ = bridge;
    }

    /// Invoke `method` with positional `args`
    ///
    /// # Errors
    ///
    /// Returns an [`InvocationError`] when the arguments cannot be decoded or the
    /// operation refuses the call
    fn invoke(
        &self,
        bridge: &BridgeHandle,
        method: &str,
        args: &Args<'_>,
    ) -> Result<(), InvocationError>;

    /// Capability probe used by the UI manager to discover view managers
    fn as_view_manager(&self) -> Option<&dyn ViewManager> {
        None
    }
}

/// Produces a native module at registry construction time
pub trait ModuleFactory {
    fn create(&self) -> Rc<dyn NativeModule>;
}

impl<F> ModuleFactory for F
where
    F: Fn() -> Rc<dyn NativeModule>,
{
    fn create(&self) -> Rc<dyn NativeModule> {
        self()
    }
}

/// Box a constructor as a [`ModuleFactory`]
pub fn factory<M, F>(create: F) -> Box<dyn ModuleFactory>
where
    M: NativeModule + 'static,
    F: Fn() -> M + 'static,
{
    Box::new(move || -> Rc<dyn NativeModule> { Rc::new(create()) })
}

/// Positional arguments of one invocation, with best-effort decoding
#[derive(Debug, Clone, Copy)]
pub struct Args<'a> {
    module: &'a str,
    method: &'a str,
    values: &'a [Value],
}

impl<'a> Args<'a> {
    pub fn new(module: &'a str, method: &'a str, values: &'a [Value]) -> Self {
        Self {
            module,
            method,
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw value at `index`
    pub fn raw(&self, index: usize) -> Option<&'a Value> {
        self.values.get(index)
    }

    /// Decode the argument at `index`
    ///
    /// # Errors
    ///
    /// Fails when the argument is missing or does not decode into `T`
    pub fn get<T: DeserializeOwned>(&self, index: usize) -> Result<T, InvocationError> {
        let value = self
            .values
            .get(index)
            .ok_or_else(|| self.argument_error(index, "is missing".to_string()))?;
        serde_json::from_value(value.clone())
            .map_err(|e| self.argument_error(index, format!("could not be decoded: {e}")))
    }

    /// Decode the argument at `index`, treating a missing or `null` value as `None`
    ///
    /// # Errors
    ///
    /// Fails when the argument is present but does not decode into `T`
    pub fn optional<T: DeserializeOwned>(&self, index: usize) -> Result<Option<T>, InvocationError> {
        match self.values.get(index) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.get(index).map(Some),
        }
    }

    /// Decode a callback id at `index`
    ///
    /// # Errors
    ///
    /// Fails when the argument is not a non-negative integer
    pub fn callback(&self, index: usize) -> Result<CallbackId, InvocationError> {
        self.get(index)
    }

    /// Build a rejection for this invocation
    pub fn reject(&self, reason: impl Into<String>) -> InvocationError {
        InvocationError::Rejected {
            module: self.module.to_string(),
            method: self.method.to_string(),
            reason: reason.into(),
        }
    }

    fn argument_error(&self, index: usize, reason: String) -> InvocationError {
        InvocationError::Argument {
            module: self.module.to_string(),
            method: self.method.to_string(),
            index,
            reason,
        }
    }
}

/// One invokable operation on a registered module
#[derive(Clone)]
pub struct MethodDescriptor {
    id: MethodId,
    name: &'static str,
    module_name: Rc<str>,
    module: Rc<dyn NativeModule>,
}

impl MethodDescriptor {
    pub fn id(&self) -> MethodId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    /// Invoke the underlying native operation
    ///
    /// # Errors
    ///
    /// Returns the native operation's [`InvocationError`]
    pub fn invoke(&self, bridge: &BridgeHandle, args: &[Value]) -> Result<(), InvocationError> {
        let args = Args::new(&self.module_name, self.name, args);
        self.module.invoke(bridge, self.name, &args)
    }
}

impl std::fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("id", &self.id)
            .field("module", &self.module_name)
            .field("name", &self.name)
            .finish()
    }
}

/// Snapshot of a module sent to the script side
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleInfo {
    #[serde(rename = "moduleID")]
    pub module_id: ModuleId,
    pub constants: Map<String, Value>,
    pub methods: IndexMap<String, MethodId>,
}

/// A registered native module with a fixed id and method table
pub struct ModuleDescriptor {
    id: ModuleId,
    name: Rc<str>,
    module: Rc<dyn NativeModule>,
    methods: Vec<MethodDescriptor>,
}

impl ModuleDescriptor {
    pub(crate) fn new(id: ModuleId, module: Rc<dyn NativeModule>) -> Self {
        let name: Rc<str> = Rc::from(module.name());
        let methods = module
            .methods()
            .iter()
            .enumerate()
            .map(|(method_id, &method)| MethodDescriptor {
                id: method_id,
                name: method,
                module_name: Rc::clone(&name),
                module: Rc::clone(&module),
            })
            .collect();

        Self {
            id,
            name,
            module,
            methods,
        }
    }

    pub fn id(&self) -> ModuleId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn module(&self) -> &Rc<dyn NativeModule> {
        &self.module
    }

    pub fn method(&self, method_id: MethodId) -> Option<&MethodDescriptor> {
        self.methods.get(method_id)
    }

    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.methods
    }

    /// Constants and method ids, as exported to the script side
    pub fn info(&self) -> ModuleInfo {
        ModuleInfo {
            module_id: self.id,
            constants: self.module.constants(),
            methods: self
                .methods
                .iter()
                .map(|m| (m.name.to_string(), m.id))
                .collect(),
        }
    }
}

impl std::fmt::Debug for ModuleDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleDescriptor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("methods", &self.methods)
            .finish_non_exhaustive()
    }
}
