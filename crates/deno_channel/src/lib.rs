//! # Deno Channel
//!
//! An [`ExecutionChannel`] backed by a `deno_core::JsRuntime`.
//!
//! V8 isolates must stay on the thread that created them, so the runtime lives on a
//! dedicated OS thread with its own single-threaded tokio runtime. Requests are sent to
//! that thread as jobs and processed strictly in order; every returned future resolves
//! once the worker has answered.
//!
//! The runtime is created with the `batched_bridge` extension, which installs the
//! script-side message queue on `globalThis`:
//!
//! - `BatchedBridge` / `__fbBatchedBridge`: `callFunctionReturnFlushedQueue`,
//!   `invokeCallbackAndReturnFlushedQueue`, `flushedQueue`, `registerCallableModule`,
//!   `enqueueNativeCall`
//! - `NativeModules`, built from the injected `__fbBatchedBridgeConfig`
//! - `JSTimersExecution` and `setTimeout` / `setInterval` on top of `RCTTiming`
//! - `AppRegistry`
//!
//! ```rust,no_run
//! use bridge_core::BridgeEngine;
//! use deno_channel::DenoChannel;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut engine = BridgeEngine::builder(DenoChannel::new()?)
//!     .bundle_url("file:///app/index.bundle.js".parse()?)
//!     .network_client(reqwest::Client::new())
//!     .build();
//! engine.init().await?;
//! engine.run_until_idle().await;
//! # Ok(())
//! # }
//! ```

use bridge_core::{ChannelError, ExecutionChannel};
use deno_core::{JsRuntime, PollEventLoopOptions, RuntimeOptions, v8};
use futures::FutureExt;
use futures::future::LocalBoxFuture;
use log::{debug, error, trace};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use url::Url;

#[cfg(test)]
mod tests;

deno_core::extension!(
    batched_bridge,
    esm_entry_point = "ext:batched_bridge/batched_bridge.js",
    esm = [ dir "src/js", "batched_bridge.js" ],
);

/// A job sent to the runtime thread
enum Job {
    Init {
        response: oneshot::Sender<Result<(), ChannelError>>,
    },
    Evaluate {
        name: &'static str,
        code: String,
        /// Convert the completion value to JSON; otherwise answer `null`
        capture: bool,
        response: oneshot::Sender<Result<Value, ChannelError>>,
    },
    Settle {
        response: oneshot::Sender<()>,
    },
}

/// Execution channel running script on a dedicated V8 thread
///
/// Cloning is cheap; every clone talks to the same runtime. The thread exits when the
/// last clone is dropped.
#[derive(Clone, Debug)]
pub struct DenoChannel {
    sender: mpsc::UnboundedSender<Job>,
}

impl DenoChannel {
    /// Spawn the runtime thread
    ///
    /// The `JsRuntime` itself is only created by [`ExecutionChannel::init`].
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Init`] when the thread cannot be spawned
    pub fn new() -> Result<Self, ChannelError> {
        let (tx, rx) = mpsc::unbounded_channel::<Job>();

        std::thread::Builder::new()
            .name("deno-channel".to_string())
            .spawn(move || {
                let rt = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        error!("Failed to create the script runtime thread: {e}");
                        return;
                    }
                };
                rt.block_on(Worker::default().run(rx));
            })
            .map_err(|e| ChannelError::Init(e.to_string()))?;

        Ok(Self { sender: tx })
    }

    /// Evaluate `code` as a classic script and return its completion value as JSON
    pub fn evaluate(&self, code: String) -> LocalBoxFuture<'static, Result<Value, ChannelError>> {
        self.request("<evaluate>", code, true)
    }

    /// Run `code` for its side effects; the completion value is never inspected
    fn run_script(
        &self,
        name: &'static str,
        code: String,
    ) -> LocalBoxFuture<'static, Result<(), ChannelError>> {
        self.request(name, code, false)
            .map(|r| r.map(drop))
            .boxed_local()
    }

    fn request(
        &self,
        name: &'static str,
        code: String,
        capture: bool,
    ) -> LocalBoxFuture<'static, Result<Value, ChannelError>> {
        let sender = self.sender.clone();
        async move {
            let (tx, rx) = oneshot::channel();
            sender
                .send(Job::Evaluate {
                    name,
                    code,
                    capture,
                    response: tx,
                })
                .map_err(|_| ChannelError::Closed)?;
            rx.await.map_err(|_| ChannelError::Closed)?
        }
        .boxed_local()
    }
}

impl ExecutionChannel for DenoChannel {
    fn init(&self) -> LocalBoxFuture<'static, Result<(), ChannelError>> {
        let sender = self.sender.clone();
        async move {
            let (tx, rx) = oneshot::channel();
            sender
                .send(Job::Init { response: tx })
                .map_err(|_| ChannelError::Closed)?;
            rx.await.map_err(|_| ChannelError::Closed)?
        }
        .boxed_local()
    }

    fn inject_json(
        &self,
        name: &str,
        value: Value,
    ) -> LocalBoxFuture<'static, Result<(), ChannelError>> {
        let code = format!("globalThis[{}] = {value};", Value::from(name));
        self.run_script("<inject>", code)
    }

    fn execute_js_call(
        &self,
        module: &str,
        method: &str,
        args: Vec<Value>,
    ) -> LocalBoxFuture<'static, Result<Value, ChannelError>> {
        self.request("<bridge>", call_expression(module, method, &args), true)
    }

    fn execute_application_script(
        &self,
        source: String,
        origin: Url,
    ) -> LocalBoxFuture<'static, Result<(), ChannelError>> {
        debug!("Running application script from {origin}");
        self.run_script("<application>", source)
    }

    /// Resolves once every job sent before it has been processed and its event loop
    /// drained
    fn settled(&self) -> LocalBoxFuture<'static, ()> {
        let sender = self.sender.clone();
        async move {
            let (tx, rx) = oneshot::channel();
            if sender.send(Job::Settle { response: tx }).is_ok() {
                let _ = rx.await;
            }
        }
        .boxed_local()
    }
}

/// `module.method(...args)` with `this` bound to the module object
fn call_expression(module: &str, method: &str, args: &[Value]) -> String {
    let module = Value::from(module);
    let method = Value::from(method);
    let args = Value::from(args.to_vec());
    format!("(() => {{ const m = globalThis[{module}]; return m[{method}].apply(m, {args}); }})()")
}

#[derive(Default)]
struct Worker {
    runtime: Option<JsRuntime>,
}

impl Worker {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Job>) {
        // Process jobs sequentially on this thread
        while let Some(job) = rx.recv().await {
            match job {
                Job::Init { response } => {
                    let _ = response.send(self.init());
                }
                Job::Evaluate {
                    name,
                    code,
                    capture,
                    response,
                } => {
                    let result = self.evaluate(name, code, capture).await;
                    if let Err(e) = &result {
                        debug!("{name} failed: {e}");
                    }
                    let _ = response.send(result);
                }
                Job::Settle { response } => {
                    let _ = response.send(());
                }
            }
        }
        debug!("Execution channel closed, stopping script thread");
    }

    fn init(&mut self) -> Result<(), ChannelError> {
        if self.runtime.is_some() {
            return Err(ChannelError::Init("runtime already initialized".to_string()));
        }
        self.runtime = Some(JsRuntime::new(RuntimeOptions {
            extensions: vec![batched_bridge::init()],
            ..Default::default()
        }));
        debug!("JavaScript runtime ready");
        Ok(())
    }

    async fn evaluate(
        &mut self,
        name: &'static str,
        code: String,
        capture: bool,
    ) -> Result<Value, ChannelError> {
        let runtime = self
            .runtime
            .as_mut()
            .ok_or_else(|| ChannelError::Init("runtime not initialized".to_string()))?;

        trace!("{name}: {code}");
        let global = runtime
            .execute_script(name, code)
            .map_err(|e| ChannelError::Script(e.to_string()))?;
        runtime
            .run_event_loop(PollEventLoopOptions::default())
            .await
            .map_err(|e| ChannelError::Script(e.to_string()))?;

        if capture {
            to_json(runtime, global)
        } else {
            Ok(Value::Null)
        }
    }
}

fn to_json(runtime: &mut JsRuntime, global: v8::Global<v8::Value>) -> Result<Value, ChannelError> {
    deno_core::scope!(scope, runtime);
    let local = v8::Local::new(scope, global);
    deno_core::serde_v8::from_v8::<Value>(scope, local)
        .map_err(|e| ChannelError::Script(format!("result is not JSON: {e}")))
}
