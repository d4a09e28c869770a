//! Tests for the deno channel
//!
//! Every test spins up a real `JsRuntime`, so they run serially.

mod engine_integration;
