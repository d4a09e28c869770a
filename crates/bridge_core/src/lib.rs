//! # Bridge Core
//!
//! The native half of a batched script-to-native bridge.
//!
//! ## Overview
//!
//! A script runtime talks to native code by queueing calls as `(moduleID, methodID, params)`
//! triples and handing the whole queue back whenever native code calls into it. This crate
//! provides:
//! - **Module registry**: numeric ids for every native module and method, plus the
//!   configuration document the script side builds its `NativeModules` proxies from
//! - **Wire codec**: decoding of `[moduleIDs, methodIDs, params]` batches and the
//!   outbound calls (`callFunctionReturnFlushedQueue`, `invokeCallbackAndReturnFlushedQueue`,
//!   `flushedQueue`)
//! - **Engine**: the lifecycle state machine (init, config injection, source loading,
//!   script execution, first flush, ready) and the dispatch loop
//! - **Built-in modules**: timers, networking, source code, view managers and a headless
//!   UI manager
//!
//! The engine never runs script itself; it talks to an [`ExecutionChannel`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bridge_core::{BridgeEngine, ExecutionChannel};
//!
//! # async fn example(channel: impl ExecutionChannel + 'static) -> bridge_core::Result<()> {
//! let mut engine = BridgeEngine::builder(channel)
//!     .bundle_url("file:///app/index.bundle.js".parse().expect("valid url"))
//!     .network_client(reqwest::Client::new())
//!     .build();
//!
//! engine.on_ready(|| println!("bridge ready"));
//! engine.init().await?;
//! engine.run_until_idle().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Threading
//!
//! Everything runs on one thread. Modules are `Rc`-shared, continuations are
//! `!Send` futures, and the engine must be driven from a current-thread runtime or a
//! `LocalSet`.

mod channel;
mod engine;
mod error;
mod handle;
mod module;
pub mod modules;
mod registry;
mod source;
pub mod wire;

#[cfg(test)]
mod tests;

pub use channel::{ExecutionChannel, Rendezvous};
pub use engine::{BridgeEngine, BridgeEngineBuilder, BridgeState, DispatchReport};
pub use error::{BridgeError, ChannelError, InvocationError, Result, SourceError};
pub use handle::BridgeHandle;
pub use module::{
    Args, CallbackId, MethodDescriptor, MethodId, ModuleDescriptor, ModuleFactory, ModuleId,
    ModuleInfo, NativeModule, factory,
};
pub use registry::ModuleRegistry;
pub use source::SourceProvider;
