//! Handle for calling back into the engine from native modules

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use log::warn;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::module::CallbackId;
use crate::wire::OutboundCall;

/// Work queued onto the engine loop
pub(crate) enum Command {
    /// Issue a call into the execution channel and dispatch its result
    Call(OutboundCall),
    /// Drive a native continuation on the engine loop
    Schedule(LocalBoxFuture<'static, ()>),
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Call(call) => f.debug_tuple("Call").field(call).finish(),
            Command::Schedule(_) => f.write_str("Schedule(..)"),
        }
    }
}

/// Cheap, cloneable handle onto the engine's command queue
///
/// Every method only enqueues work; nothing runs until the engine loop picks it up,
/// so calling these from inside a method invocation is safe.
#[derive(Clone, Debug)]
pub struct BridgeHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl BridgeHandle {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Command>) -> Self {
        Self { tx }
    }

    /// Call `module.method(...args)` through the script-side dispatcher
    pub fn enqueue_js_call(&self, module: &str, method: &str, args: Vec<Value>) {
        self.send(Command::Call(OutboundCall::dispatch(module, method, args)));
    }

    /// Call an arbitrary script-side global `module.method(...args)` directly
    pub fn invoke_and_process(&self, module: &str, method: &str, args: Vec<Value>) {
        self.send(Command::Call(OutboundCall::direct(module, method, args)));
    }

    /// Invoke a script callback previously handed to a native method
    pub fn invoke_callback(&self, callback_id: CallbackId, args: Vec<Value>) {
        self.send(Command::Call(OutboundCall::callback(callback_id, args)));
    }

    /// Run `task` on the engine loop
    pub fn schedule<F>(&self, task: F)
    where
        F: Future<Output = ()> + 'static,
    {
        self.send(Command::Schedule(task.boxed_local()));
    }

    fn send(&self, command: Command) {
        if let Err(mpsc::error::SendError(command)) = self.tx.send(command) {
            warn!("Bridge engine is gone, dropping {command:?}");
        }
    }
}
