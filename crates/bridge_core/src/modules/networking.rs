use log::debug;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::error::InvocationError;
use crate::handle::BridgeHandle;
use crate::module::{Args, CallbackId, NativeModule};

const METHODS: &[&str] = &["sendRequest"];

/// Request description passed by the script side
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RequestQuery {
    #[serde(default = "default_method")]
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub headers: Map<String, Value>,
    #[serde(default)]
    pub data: Option<String>,
}

fn default_method() -> String {
    "GET".to_string()
}

/// `RCTNetworking`: HTTP requests on behalf of the script side
///
/// The callback receives `[status, headers, body]`. Transport failures report status
/// `0`, empty headers and the error text as body.
#[derive(Debug, Clone, Default)]
pub struct Networking {
    client: reqwest::Client,
}

impl Networking {
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn send_request(&self, bridge: &BridgeHandle, args: &Args<'_>) -> Result<(), InvocationError> {
        let query: RequestQuery = args.get(0)?;
        let callback: CallbackId = args.callback(1)?;

        let method = reqwest::Method::from_bytes(query.method.to_uppercase().as_bytes())
            .map_err(|_| args.reject(format!("unsupported HTTP method: {}", query.method)))?;
        let url = url::Url::parse(&query.url)
            .map_err(|e| args.reject(format!("invalid URL \"{}\": {e}", query.url)))?;

        let mut request = self.client.request(method, url);
        for (key, value) in &query.headers {
            if let Some(value) = value.as_str() {
                request = request.header(key, value);
            }
        }
        if let Some(body) = query.data {
            request = request.body(body);
        }

        let target = query.url;
        let callback_bridge = bridge.clone();
        bridge.schedule(async move {
            let response = match perform(request).await {
                Ok(response) => response,
                Err(e) => {
                    debug!("Request to {target} failed: {e}");
                    vec![json!(0), json!({}), json!(e.to_string())]
                }
            };
            callback_bridge.invoke_callback(callback, response);
        });

        Ok(())
    }
}

async fn perform(request: reqwest::RequestBuilder) -> Result<Vec<Value>, reqwest::Error> {
    let response = request.send().await?;
    let status = response.status().as_u16();
    let headers: Map<String, Value> = response
        .headers()
        .iter()
        .map(|(k, v)| {
            (
                k.as_str().to_string(),
                Value::String(v.to_str().unwrap_or("").to_string()),
            )
        })
        .collect();
    let body = response.text().await?;

    Ok(vec![json!(status), Value::Object(headers), json!(body)])
}

impl NativeModule for Networking {
    fn name(&self) -> &str {
        "RCTNetworking"
    }

    fn methods(&self) -> &[&'static str] {
        METHODS
    }

    fn invoke(
        &self,
        bridge: &BridgeHandle,
        method: &str,
        args: &Args<'_>,
    ) -> Result<(), InvocationError> {
        match method {
            "sendRequest" => self.send_request(bridge, args),
            other => Err(args.reject(format!("unknown method {other}"))),
        }
    }
}
