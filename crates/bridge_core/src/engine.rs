//! Bridge engine: lifecycle state machine and dispatch loop
//!
//! The engine owns the module registry and drives everything from one task. Calls into
//! the execution channel are pushed onto a set of pending continuations; their results
//! come back to [`BridgeEngine::run_until_idle`] / [`BridgeEngine::run_until`] and are
//! dispatched strictly in queue order.
//!
//! Lifecycle:
//! `Created → Initializing → ConfigInjected → SourceLoading → ScriptExecuting → Ready → SteadyState`

use std::pin::pin;
use std::rc::Rc;

use futures::FutureExt;
use futures::StreamExt;
use futures::future::LocalBoxFuture;
use futures::stream::FuturesUnordered;
use log::{debug, error, info, trace, warn};
use serde_json::Value;
use tokio::sync::mpsc;
use url::Url;

use crate::channel::{ExecutionChannel, Rendezvous};
use crate::error::{BridgeError, ChannelError, Result, SourceError};
use crate::handle::{BridgeHandle, Command};
use crate::module::{ModuleFactory, NativeModule};
use crate::modules::{SourceCode, UiManager, internal_modules};
use crate::registry::ModuleRegistry;
use crate::source::SourceProvider;
use crate::wire::{Batch, CONFIG_GLOBAL, OutboundCall};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BridgeState {
    Created,
    Initializing,
    ConfigInjected,
    SourceLoading,
    ScriptExecuting,
    Ready,
    SteadyState,
}

/// Outcome of dispatching one batch
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Calls that reached their native method and succeeded
    pub invoked: usize,
    /// Calls that were skipped, in queue order
    pub skipped: Vec<BridgeError>,
}

enum Completion {
    SourceLoaded(std::result::Result<String, SourceError>),
    ScriptDone(std::result::Result<(), ChannelError>),
    FirstFlush(std::result::Result<Value, ChannelError>),
    CallReturned(OutboundCall, std::result::Result<Value, ChannelError>),
    Task,
}

type Pending = FuturesUnordered<LocalBoxFuture<'static, Completion>>;

pub struct BridgeEngineBuilder {
    channel: Rc<dyn ExecutionChannel>,
    internal: Vec<Box<dyn ModuleFactory>>,
    plugins: Vec<Box<dyn ModuleFactory>>,
    source: Rc<dyn SourceProvider>,
    bundle_url: Option<Url>,
    network: Option<reqwest::Client>,
    rendezvous: Rendezvous,
}

impl BridgeEngineBuilder {
    /// Replace the internal module set (defaults to [`internal_modules`])
    #[must_use]
    pub fn internal_modules(mut self, factories: Vec<Box<dyn ModuleFactory>>) -> Self {
        self.internal = factories;
        self
    }

    /// Plugin modules, registered after the internal set
    #[must_use]
    pub fn plugins(mut self, factories: Vec<Box<dyn ModuleFactory>>) -> Self {
        self.plugins = factories;
        self
    }

    /// Replace the built-in [`SourceCode`] provider
    #[must_use]
    pub fn source_provider(mut self, source: Rc<dyn SourceProvider>) -> Self {
        self.source = source;
        self
    }

    #[must_use]
    pub fn bundle_url(mut self, url: Url) -> Self {
        self.bundle_url = Some(url);
        self
    }

    #[must_use]
    pub fn network_client(mut self, client: reqwest::Client) -> Self {
        self.network = Some(client);
        self
    }

    #[must_use]
    pub fn rendezvous(mut self, rendezvous: Rendezvous) -> Self {
        self.rendezvous = rendezvous;
        self
    }

    pub fn build(self) -> BridgeEngine {
        let (tx, commands) = mpsc::unbounded_channel();
        BridgeEngine {
            channel: self.channel,
            registry: ModuleRegistry::new(),
            internal: self.internal,
            plugins: self.plugins,
            source: self.source,
            ui_manager: Rc::new(UiManager::new()),
            bundle_url: self.bundle_url,
            network: self.network,
            rendezvous: self.rendezvous,
            state: BridgeState::Created,
            handle: BridgeHandle::new(tx),
            commands,
            pending: FuturesUnordered::new(),
            ready_observers: Vec::new(),
            ready: false,
        }
    }
}

/// Drives one script runtime through its lifecycle and dispatches its call batches
pub struct BridgeEngine {
    channel: Rc<dyn ExecutionChannel>,
    registry: ModuleRegistry,
    internal: Vec<Box<dyn ModuleFactory>>,
    plugins: Vec<Box<dyn ModuleFactory>>,
    source: Rc<dyn SourceProvider>,
    ui_manager: Rc<UiManager>,
    bundle_url: Option<Url>,
    network: Option<reqwest::Client>,
    rendezvous: Rendezvous,
    state: BridgeState,
    handle: BridgeHandle,
    commands: mpsc::UnboundedReceiver<Command>,
    pending: Pending,
    ready_observers: Vec<Box<dyn FnOnce()>>,
    ready: bool,
}

impl BridgeEngine {
    pub fn builder<C>(channel: C) -> BridgeEngineBuilder
    where
        C: ExecutionChannel + 'static,
    {
        BridgeEngineBuilder {
            channel: Rc::new(channel),
            internal: internal_modules(),
            plugins: Vec::new(),
            source: Rc::new(SourceCode::new()),
            bundle_url: None,
            network: None,
            rendezvous: Rendezvous::default(),
        }
    }

    pub fn state(&self) -> BridgeState {
        self.state
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn handle(&self) -> BridgeHandle {
        self.handle.clone()
    }

    pub fn ui_manager(&self) -> &Rc<UiManager> {
        &self.ui_manager
    }

    pub fn bundle_url(&self) -> Option<&Url> {
        self.bundle_url.as_ref()
    }

    pub fn set_bundle_url(&mut self, url: Url) {
        self.bundle_url = Some(url);
    }

    pub fn set_network_client(&mut self, client: reqwest::Client) {
        self.network = Some(client);
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Register an observer for the one-time "bridge ready" signal
    ///
    /// Observers registered after the signal fired are called immediately.
    pub fn on_ready<F>(&mut self, observer: F)
    where
        F: FnOnce() + 'static,
    {
        if self.ready {
            observer();
        } else {
            self.ready_observers.push(Box::new(observer));
        }
    }

    /// Prepare the channel, register every module, inject the configuration and start
    /// loading the application script
    ///
    /// # Errors
    ///
    /// Fails when the channel cannot initialise or accept the configuration, or when
    /// the source cannot be requested (see [`BridgeEngine::load_source`]). The engine
    /// stays in the state it reached; once the configuration is injected, bind the
    /// missing collaborator and retry with `load_source`.
    pub async fn init(&mut self) -> Result<()> {
        if self.state > BridgeState::Initializing {
            return Err(BridgeError::Configuration(format!(
                "bridge already initialized ({:?})",
                self.state
            )));
        }

        info!("Initializing bridge");
        self.state = BridgeState::Initializing;
        self.channel.init().await?;

        self.register_modules();

        let config = self.registry.build_config();
        let config = config.to_value();
        debug!(
            "{}",
            serde_json::to_string_pretty(&config).unwrap_or_default()
        );
        self.channel.inject_json(CONFIG_GLOBAL, config).await?;
        self.state = BridgeState::ConfigInjected;

        self.load_source()
    }

    /// Ask the source provider for the application script
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Configuration`] when no network client or bundle URL is
    /// bound, or when the configuration has not been injected yet
    pub fn load_source(&mut self) -> Result<()> {
        if self.state != BridgeState::ConfigInjected {
            return Err(BridgeError::Configuration(format!(
                "cannot load sources while {:?}",
                self.state
            )));
        }

        let Some(client) = self.network.clone() else {
            error!("No network client for loading sources");
            return Err(BridgeError::Configuration(
                "no network client for loading sources".to_string(),
            ));
        };

        if let Some(url) = &self.bundle_url {
            self.source.set_script_url(url.clone());
        }
        let Some(url) = self.source.script_url() else {
            error!("No bundle URL to load sources from");
            return Err(BridgeError::Configuration(
                "no bundle URL to load sources from".to_string(),
            ));
        };

        info!("Loading application script from {url}");
        self.state = BridgeState::SourceLoading;
        let load = self.source.load_source(&client);
        self.pending
            .push(async move { Completion::SourceLoaded(load.await) }.boxed_local());
        Ok(())
    }

    /// Call `module.method(...args)` through the script-side dispatcher
    pub fn enqueue_js_call(&mut self, module: &str, method: &str, args: Vec<Value>) {
        self.issue(OutboundCall::dispatch(module, method, args));
    }

    /// Call a script-side global `module.method(...args)` directly
    pub fn invoke_and_process(&mut self, module: &str, method: &str, args: Vec<Value>) {
        self.issue(OutboundCall::direct(module, method, args));
    }

    /// Dispatch a result document returned by the channel
    ///
    /// `null` is a no-op. Calls that cannot be resolved or whose invocation fails are
    /// logged and recorded in the report; the rest of the batch still runs.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::ProtocolShape`] when the document is not a batch; nothing
    /// is invoked in that case
    pub fn process_result(&self, doc: &Value) -> Result<DispatchReport> {
        let mut report = DispatchReport::default();
        let Some(batch) = Batch::decode(doc)? else {
            return Ok(report);
        };

        for call in batch.calls() {
            let outcome = self
                .registry
                .resolve_raw(call.module_id, call.method_id)
                .and_then(|method| {
                    let Value::Array(args) = call.params else {
                        return Err(BridgeError::ProtocolShape(format!(
                            "params of call {} should be an array",
                            call.index
                        )));
                    };
                    trace!(
                        "Invoking {}.{} with {args:?}",
                        method.module_name(),
                        method.name()
                    );
                    method.invoke(&self.handle, args).map_err(BridgeError::from)
                });

            match outcome {
                Ok(()) => report.invoked += 1,
                Err(e) => {
                    warn!("Skipping call {}: {e}", call.index);
                    report.skipped.push(e);
                }
            }
        }

        Ok(report)
    }

    /// Drive the engine until no command is queued and no continuation is pending
    ///
    /// Never returns while a repeating timer is alive; use [`BridgeEngine::run_until`]
    /// for long-running applications.
    pub async fn run_until_idle(&mut self) {
        loop {
            while let Ok(command) = self.commands.try_recv() {
                self.handle_command(command);
            }
            if self.pending.is_empty() {
                break;
            }
            tokio::select! {
                biased;
                Some(command) = self.commands.recv() => self.handle_command(command),
                Some(completion) = self.pending.next() => self.complete(completion),
            }
        }
    }

    /// Create and register every module, in order: internal set, plugins,
    /// `SourceCode`, `UIManager`
    ///
    /// Runs once; `init` calls it, and it can be called earlier to inspect the registry
    /// without touching the channel.
    pub fn register_modules(&mut self) -> &ModuleRegistry {
        if self.registry.is_empty() {
            self.init_modules();
        }
        &self.registry
    }

    /// Drive the engine until `shutdown` resolves
    pub async fn run_until<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut shutdown = pin!(shutdown);
        loop {
            tokio::select! {
                () = &mut shutdown => break,
                Some(command) = self.commands.recv() => self.handle_command(command),
                Some(completion) = self.pending.next(), if !self.pending.is_empty() => {
                    self.complete(completion);
                }
            }
        }
    }

    fn init_modules(&mut self) {
        let modules: Vec<Rc<dyn NativeModule>> = self
            .internal
            .iter()
            .chain(self.plugins.iter())
            .map(|factory| factory.create())
            .collect();

        for module in modules {
            self.add_module(module);
        }

        // Special cases: the UI manager goes last, it enumerates every view manager
        // registered before it
        if let Some(url) = &self.bundle_url {
            self.source.set_script_url(url.clone());
        }
        let source: Rc<dyn NativeModule> = self.source.clone();
        self.add_module(source);
        self.ui_manager.collect_view_managers(&self.registry);
        let ui_manager: Rc<dyn NativeModule> = self.ui_manager.clone();
        self.add_module(ui_manager);
    }

    fn add_module(&mut self, module: Rc<dyn NativeModule>) {
        module.set_bridge(self.handle.clone());
        self.registry.register(module);
    }

    fn issue(&mut self, call: OutboundCall) {
        let result = self
            .channel
            .execute_js_call(&call.module, &call.method, call.args.clone());
        self.pending
            .push(async move { Completion::CallReturned(call, result.await) }.boxed_local());
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Call(call) => self.issue(call),
            Command::Schedule(task) => self.pending.push(
                async move {
                    task.await;
                    Completion::Task
                }
                .boxed_local(),
            ),
        }
    }

    fn complete(&mut self, completion: Completion) {
        match completion {
            Completion::SourceLoaded(Ok(source)) => self.sources_finished(source),
            Completion::SourceLoaded(Err(e)) => {
                error!("Failed to load application script: {e}");
                self.state = BridgeState::ConfigInjected;
            }
            Completion::ScriptDone(Ok(())) => self.application_script_done(),
            Completion::ScriptDone(Err(e)) => {
                error!("Application script failed: {e}");
            }
            Completion::FirstFlush(Ok(doc)) => {
                self.dispatch(&doc);
                self.mark_ready();
            }
            Completion::FirstFlush(Err(e)) => {
                error!("Initial flush failed: {e}");
            }
            Completion::CallReturned(_, Ok(doc)) => self.dispatch(&doc),
            Completion::CallReturned(call, Err(e)) => {
                warn!("{}.{} failed: {e}", call.module, call.method);
            }
            Completion::Task => {}
        }
    }

    fn sources_finished(&mut self, source: String) {
        let Some(origin) = self.source.script_url().or_else(|| self.bundle_url.clone()) else {
            error!("Sources loaded without a script URL");
            return;
        };

        info!("Executing application script ({} bytes)", source.len());
        self.state = BridgeState::ScriptExecuting;
        let channel = Rc::clone(&self.channel);
        let rendezvous = self.rendezvous;
        self.pending.push(
            async move {
                rendezvous.wait(channel.as_ref()).await;
                let result = channel.execute_application_script(source, origin).await;
                Completion::ScriptDone(result)
            }
            .boxed_local(),
        );
    }

    fn application_script_done(&mut self) {
        debug!("Application script done, requesting first flush");
        self.state = BridgeState::Ready;
        let channel = Rc::clone(&self.channel);
        let rendezvous = self.rendezvous;
        self.pending.push(
            async move {
                rendezvous.wait(channel.as_ref()).await;
                let flush = OutboundCall::flush();
                let result = channel
                    .execute_js_call(&flush.module, &flush.method, flush.args)
                    .await;
                Completion::FirstFlush(result)
            }
            .boxed_local(),
        );
    }

    fn dispatch(&self, doc: &Value) {
        match self.process_result(doc) {
            Ok(report) if !report.skipped.is_empty() => debug!(
                "Dispatched {} calls, skipped {}",
                report.invoked,
                report.skipped.len()
            ),
            Ok(_) => {}
            Err(e) => error!("Returned document from executor in unexpected form: {e}"),
        }
    }

    fn mark_ready(&mut self) {
        if self.ready {
            return;
        }
        self.ready = true;
        self.state = BridgeState::SteadyState;
        info!("Bridge ready");
        for observer in self.ready_observers.drain(..) {
            observer();
        }
    }
}
