//! Execution channel seam
//!
//! The engine never runs script itself. It hands text and calls to an
//! [`ExecutionChannel`] and processes whatever document comes back.

use std::time::Duration;

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use serde_json::Value;
use url::Url;

use crate::error::ChannelError;

/// Something that can run script text and evaluate calls, answering asynchronously
///
/// Returned futures must be lazy: the channel does no work until the future is polled,
/// which lets the engine decide when each request is actually issued.
pub trait ExecutionChannel {
    /// Prepare the underlying script context
    fn init(&self) -> LocalBoxFuture<'static, Result<(), ChannelError>>;

    /// Bind `value` to the global `name`
    fn inject_json(&self, name: &str, value: Value)
    -> LocalBoxFuture<'static, Result<(), ChannelError>>;

    /// Evaluate `module.method(...args)` and return the resulting document
    fn execute_js_call(
        &self,
        module: &str,
        method: &str,
        args: Vec<Value>,
    ) -> LocalBoxFuture<'static, Result<Value, ChannelError>>;

    /// Run the application entry point
    fn execute_application_script(
        &self,
        source: String,
        origin: Url,
    ) -> LocalBoxFuture<'static, Result<(), ChannelError>>;

    /// Resolves once the channel has no internal work outstanding
    ///
    /// Channels that cannot tell resolve immediately and rely on the engine's
    /// minimum delay.
    fn settled(&self) -> LocalBoxFuture<'static, ()> {
        futures::future::ready(()).boxed_local()
    }
}

/// Barrier between lifecycle steps
///
/// Waits for both the channel's `settled` signal and a minimum delay. The delay guards
/// against script-side module registration racing the first flush on channels that
/// settle early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rendezvous {
    pub min_delay: Duration,
}

impl Rendezvous {
    pub const DEFAULT_DELAY: Duration = Duration::from_millis(200);

    pub fn new(min_delay: Duration) -> Self {
        Self { min_delay }
    }

    /// No minimum delay, only the channel's own signal
    pub fn immediate() -> Self {
        Self::new(Duration::ZERO)
    }

    pub(crate) async fn wait(self, channel: &dyn ExecutionChannel) {
        let settled = channel.settled();
        if self.min_delay.is_zero() {
            settled.await;
        } else {
            futures::join!(tokio::time::sleep(self.min_delay), settled);
        }
    }
}

impl Default for Rendezvous {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DELAY)
    }
}
