use std::cell::RefCell;
use std::rc::Rc;

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use serde_json::{Map, Value, json};
use url::Url;

use crate::error::{InvocationError, SourceError};
use crate::handle::BridgeHandle;
use crate::module::{Args, NativeModule};
use crate::source::SourceProvider;

const METHODS: &[&str] = &["getScriptText"];

/// `SourceCode`: resolves the application bundle and reports it back to the script side
///
/// `file://` URLs are read from disk, `http(s)://` URLs are fetched with the engine's
/// network client.
#[derive(Debug, Default)]
pub struct SourceCode {
    script_url: RefCell<Option<Url>>,
    source: Rc<RefCell<Option<String>>>,
}

impl SourceCode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text of the last successful load
    pub fn source_code(&self) -> Option<String> {
        self.source.borrow().clone()
    }

    fn get_script_text(&self, bridge: &BridgeHandle, args: &Args<'_>) -> Result<(), InvocationError> {
        let on_success = args.callback(0)?;
        let on_error = args.callback(1)?;

        match (self.source.borrow().as_ref(), self.script_url.borrow().as_ref()) {
            (Some(text), Some(url)) => {
                bridge.invoke_callback(on_success, vec![json!({ "text": text, "url": url })]);
            }
            _ => bridge.invoke_callback(
                on_error,
                vec![json!({ "message": "Source code is not available" })],
            ),
        }
        Ok(())
    }
}

impl NativeModule for SourceCode {
    fn name(&self) -> &str {
        "SourceCode"
    }

    fn methods(&self) -> &[&'static str] {
        METHODS
    }

    fn constants(&self) -> Map<String, Value> {
        let url = self
            .script_url
            .borrow()
            .as_ref()
            .map(Url::to_string)
            .unwrap_or_default();
        let mut constants = Map::new();
        constants.insert("scriptURL".to_string(), Value::String(url));
        constants
    }

    fn invoke(
        &self,
        bridge: &BridgeHandle,
        method: &str,
        args: &Args<'_>,
    ) -> Result<(), InvocationError> {
        match method {
            "getScriptText" => self.get_script_text(bridge, args),
            other => Err(args.reject(format!("unknown method {other}"))),
        }
    }
}

impl SourceProvider for SourceCode {
    fn set_script_url(&self, url: Url) {
        *self.script_url.borrow_mut() = Some(url);
    }

    fn script_url(&self) -> Option<Url> {
        self.script_url.borrow().clone()
    }

    fn load_source(
        &self,
        client: &reqwest::Client,
    ) -> LocalBoxFuture<'static, Result<String, SourceError>> {
        let url = self.script_url();
        let client = client.clone();
        let cache = Rc::clone(&self.source);

        async move {
            let url = url.ok_or(SourceError::MissingUrl)?;
            let text = fetch(&client, &url).await?;
            *cache.borrow_mut() = Some(text.clone());
            Ok(text)
        }
        .boxed_local()
    }
}

async fn fetch(client: &reqwest::Client, url: &Url) -> Result<String, SourceError> {
    match url.scheme() {
        "file" => {
            let path = url
                .to_file_path()
                .map_err(|()| SourceError::UnsupportedScheme(url.to_string()))?;
            tokio::fs::read_to_string(&path)
                .await
                .map_err(|source| SourceError::Io {
                    url: url.to_string(),
                    source,
                })
        }
        "http" | "https" => {
            let http = |source| SourceError::Http {
                url: url.to_string(),
                source,
            };
            client
                .get(url.clone())
                .send()
                .await
                .and_then(reqwest::Response::error_for_status)
                .map_err(http)?
                .text()
                .await
                .map_err(http)
        }
        other => Err(SourceError::UnsupportedScheme(other.to_string())),
    }
}
