//! Tests for the bridge engine
//!
//! The engine is driven through [`ScriptedChannel`], an in-memory execution channel that
//! records every request and answers calls from a queue of canned result documents.

mod lifecycle;
mod wire;

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use serde_json::Value;
use url::Url;

use crate::error::{ChannelError, InvocationError, SourceError};
use crate::handle::BridgeHandle;
use crate::module::{Args, ModuleFactory, NativeModule};
use crate::source::SourceProvider;
use crate::{BridgeEngine, BridgeEngineBuilder, Rendezvous};

pub(crate) const BUNDLE_URL: &str = "http://localhost:8081/index.bundle";

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Event {
    Init,
    Inject(String),
    Call(String, String, Vec<Value>),
    Script(Url),
}

#[derive(Default)]
struct Script {
    events: Vec<Event>,
    injected: Vec<(String, Value)>,
    responses: VecDeque<Value>,
    fail_init: bool,
    fail_script: bool,
}

/// Execution channel answering from a script of canned documents
#[derive(Clone, Default)]
pub(crate) struct ScriptedChannel {
    script: Rc<RefCell<Script>>,
}

impl ScriptedChannel {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queue the document returned by the next `execute_js_call`; `null` once exhausted
    pub(crate) fn respond(&self, doc: Value) {
        self.script.borrow_mut().responses.push_back(doc);
    }

    pub(crate) fn fail_init(&self) {
        self.script.borrow_mut().fail_init = true;
    }

    pub(crate) fn fail_script(&self) {
        self.script.borrow_mut().fail_script = true;
    }

    pub(crate) fn events(&self) -> Vec<Event> {
        self.script.borrow().events.clone()
    }

    pub(crate) fn calls(&self) -> Vec<(String, String, Vec<Value>)> {
        self.script
            .borrow()
            .events
            .iter()
            .filter_map(|event| match event {
                Event::Call(module, method, args) => {
                    Some((module.clone(), method.clone(), args.clone()))
                }
                _ => None,
            })
            .collect()
    }

    pub(crate) fn injected(&self, name: &str) -> Option<Value> {
        self.script
            .borrow()
            .injected
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }
}

impl crate::ExecutionChannel for ScriptedChannel {
    fn init(&self) -> LocalBoxFuture<'static, Result<(), ChannelError>> {
        let script = Rc::clone(&self.script);
        async move {
            let mut script = script.borrow_mut();
            script.events.push(Event::Init);
            if script.fail_init {
                return Err(ChannelError::Init("scripted failure".to_string()));
            }
            Ok(())
        }
        .boxed_local()
    }

    fn inject_json(
        &self,
        name: &str,
        value: Value,
    ) -> LocalBoxFuture<'static, Result<(), ChannelError>> {
        let script = Rc::clone(&self.script);
        let name = name.to_string();
        async move {
            let mut script = script.borrow_mut();
            script.events.push(Event::Inject(name.clone()));
            script.injected.push((name, value));
            Ok(())
        }
        .boxed_local()
    }

    fn execute_js_call(
        &self,
        module: &str,
        method: &str,
        args: Vec<Value>,
    ) -> LocalBoxFuture<'static, Result<Value, ChannelError>> {
        let script = Rc::clone(&self.script);
        let event = Event::Call(module.to_string(), method.to_string(), args);
        async move {
            let mut script = script.borrow_mut();
            script.events.push(event);
            Ok(script.responses.pop_front().unwrap_or(Value::Null))
        }
        .boxed_local()
    }

    fn execute_application_script(
        &self,
        _source: String,
        origin: Url,
    ) -> LocalBoxFuture<'static, Result<(), ChannelError>> {
        let script = Rc::clone(&self.script);
        async move {
            let mut script = script.borrow_mut();
            script.events.push(Event::Script(origin));
            if script.fail_script {
                return Err(ChannelError::Script("Uncaught Error: boom".to_string()));
            }
            Ok(())
        }
        .boxed_local()
    }
}

/// Native module recording every invocation as `(method, args)`
pub(crate) struct Recorder {
    name: &'static str,
    methods: &'static [&'static str],
    calls: Rc<RefCell<Vec<(String, Vec<Value>)>>>,
}

impl Recorder {
    pub(crate) fn new(name: &'static str, methods: &'static [&'static str]) -> Self {
        Self {
            name,
            methods,
            calls: Rc::default(),
        }
    }

    pub(crate) fn calls(&self) -> Rc<RefCell<Vec<(String, Vec<Value>)>>> {
        Rc::clone(&self.calls)
    }
}

impl NativeModule for Recorder {
    fn name(&self) -> &str {
        self.name
    }

    fn methods(&self) -> &[&'static str] {
        self.methods
    }

    fn invoke(
        &self,
        _bridge: &BridgeHandle,
        method: &str,
        args: &Args<'_>,
    ) -> Result<(), InvocationError> {
        let values = (0..args.len()).filter_map(|i| args.raw(i).cloned()).collect();
        self.calls.borrow_mut().push((method.to_string(), values));
        Ok(())
    }
}

/// Source provider serving a fixed text
pub(crate) struct StaticSource {
    url: RefCell<Option<Url>>,
    text: String,
}

impl StaticSource {
    pub(crate) fn new(text: &str) -> Self {
        Self {
            url: RefCell::new(None),
            text: text.to_string(),
        }
    }
}

impl NativeModule for StaticSource {
    fn name(&self) -> &str {
        "SourceCode"
    }

    fn methods(&self) -> &[&'static str] {
        &[]
    }

    fn invoke(
        &self,
        _bridge: &BridgeHandle,
        method: &str,
        args: &Args<'_>,
    ) -> Result<(), InvocationError> {
        Err(args.reject(format!("unknown method {method}")))
    }
}

impl SourceProvider for StaticSource {
    fn set_script_url(&self, url: Url) {
        *self.url.borrow_mut() = Some(url);
    }

    fn script_url(&self) -> Option<Url> {
        self.url.borrow().clone()
    }

    fn load_source(
        &self,
        _client: &reqwest::Client,
    ) -> LocalBoxFuture<'static, Result<String, SourceError>> {
        futures::future::ready(Ok(self.text.clone())).boxed_local()
    }
}

/// Factory handing out one shared module instance
pub(crate) fn shared(module: Rc<dyn NativeModule>) -> Box<dyn ModuleFactory> {
    Box::new(move || Rc::clone(&module))
}

pub(crate) fn bundle_url() -> Url {
    Url::parse(BUNDLE_URL).expect("valid bundle url")
}

/// Builder with a static source, a bundle URL, a network client and no rendezvous delay
pub(crate) fn test_builder(channel: &ScriptedChannel) -> BridgeEngineBuilder {
    BridgeEngine::builder(channel.clone())
        .source_provider(Rc::new(StaticSource::new("/* bundle */")))
        .bundle_url(bundle_url())
        .network_client(reqwest::Client::new())
        .rendezvous(Rendezvous::immediate())
}
