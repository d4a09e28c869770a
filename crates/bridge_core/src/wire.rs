//! Wire encoding shared with the script-side dispatcher

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Value, json};

use crate::error::BridgeError;
use crate::module::{CallbackId, ModuleInfo};

/// Global the registry configuration is injected under
pub const CONFIG_GLOBAL: &str = "__fbBatchedBridgeConfig";

/// Script-side dispatcher every bridge call is routed through
pub const DISPATCHER: &str = "BatchedBridge";

pub const CALL_FUNCTION: &str = "callFunctionReturnFlushedQueue";
pub const INVOKE_CALLBACK: &str = "invokeCallbackAndReturnFlushedQueue";
pub const FLUSHED_QUEUE: &str = "flushedQueue";

const FIELD_MODULE_IDS: usize = 0;
const FIELD_METHOD_IDS: usize = 1;
const FIELD_PARAMS: usize = 2;

/// Configuration payload describing every registered module
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RegistryConfig {
    #[serde(rename = "remoteModuleConfig")]
    pub remote_module_config: IndexMap<String, ModuleInfo>,
}

impl RegistryConfig {
    pub fn to_value(&self) -> Value {
        // Only maps with string keys and plain numbers; cannot fail
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// A call from the native side into the execution channel
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundCall {
    pub module: String,
    pub method: String,
    pub args: Vec<Value>,
}

impl OutboundCall {
    /// `module.method(...args)` routed through the dispatcher
    pub fn dispatch(module: &str, method: &str, args: Vec<Value>) -> Self {
        Self::direct(
            DISPATCHER,
            CALL_FUNCTION,
            vec![json!(module), json!(method), Value::Array(args)],
        )
    }

    /// Script callback invocation routed through the dispatcher
    pub fn callback(callback_id: CallbackId, args: Vec<Value>) -> Self {
        Self::direct(
            DISPATCHER,
            INVOKE_CALLBACK,
            vec![json!(callback_id), Value::Array(args)],
        )
    }

    /// Request for the script side's pending call queue
    pub fn flush() -> Self {
        Self::direct(DISPATCHER, FLUSHED_QUEUE, Vec::new())
    }

    /// Arbitrary global `module.method(...args)`
    pub fn direct(module: &str, method: &str, args: Vec<Value>) -> Self {
        Self {
            module: module.to_string(),
            method: method.to_string(),
            args,
        }
    }
}

/// One script-originated call inside a batch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchCall<'a> {
    pub index: usize,
    pub module_id: &'a Value,
    pub method_id: &'a Value,
    pub params: &'a Value,
}

/// A decoded batch of script-originated calls
///
/// The wire form is `[moduleIDs, methodIDs, params, ...]`; trailing elements are ignored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Batch<'a> {
    module_ids: &'a [Value],
    method_ids: &'a [Value],
    params: &'a [Value],
}

impl<'a> Batch<'a> {
    /// Decode a result document
    ///
    /// `null` decodes to `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::ProtocolShape`] when the document is not an array of at
    /// least three lists of equal length
    pub fn decode(doc: &'a Value) -> Result<Option<Self>, BridgeError> {
        let fields = match doc {
            Value::Null => return Ok(None),
            Value::Array(fields) => fields,
            other => {
                return Err(BridgeError::ProtocolShape(format!(
                    "expected an array, got {}",
                    kind(other)
                )));
            }
        };

        let list = move |index: usize, label: &str| -> Result<&'a [Value], BridgeError> {
            match fields.get(index) {
                Some(Value::Array(values)) => Ok(values.as_slice()),
                Some(other) => Err(BridgeError::ProtocolShape(format!(
                    "{label} should be an array, got {}",
                    kind(other)
                ))),
                None => Err(BridgeError::ProtocolShape(format!("missing {label}"))),
            }
        };

        let module_ids = list(FIELD_MODULE_IDS, "module ids")?;
        let method_ids = list(FIELD_METHOD_IDS, "method ids")?;
        let params = list(FIELD_PARAMS, "params")?;

        if module_ids.len() != method_ids.len() || module_ids.len() != params.len() {
            return Err(BridgeError::ProtocolShape(format!(
                "mismatched batch lengths ({} module ids, {} method ids, {} params)",
                module_ids.len(),
                method_ids.len(),
                params.len()
            )));
        }

        Ok(Some(Self {
            module_ids,
            method_ids,
            params,
        }))
    }

    pub fn len(&self) -> usize {
        self.module_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.module_ids.is_empty()
    }

    /// Calls in queue order
    pub fn calls(self) -> impl Iterator<Item = BatchCall<'a>> {
        let Self {
            module_ids,
            method_ids,
            params,
        } = self;
        (0..module_ids.len()).map(move |index| BatchCall {
            index,
            module_id: &module_ids[index],
            method_id: &method_ids[index],
            params: &params[index],
        })
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
