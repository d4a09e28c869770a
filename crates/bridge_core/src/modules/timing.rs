use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use log::trace;
use serde_json::json;

use crate::error::InvocationError;
use crate::handle::BridgeHandle;
use crate::module::{Args, NativeModule};

const METHODS: &[&str] = &["createTimer", "deleteTimer"];

/// Shortest period a repeating timer may use
const MIN_REPEAT: Duration = Duration::from_millis(1);

/// `RCTTiming`: script timers backed by continuations on the engine loop
///
/// Expired timers are reported with `JSTimersExecution.callTimers([id])`.
#[derive(Debug, Default)]
pub struct Timing {
    // timer id -> generation, so a deleted and re-created id does not fire twice
    timers: Rc<RefCell<HashMap<u64, u64>>>,
    generation: Cell<u64>,
}

impl Timing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of timers that have not fired or been deleted
    pub fn active(&self) -> usize {
        self.timers.borrow().len()
    }

    fn create_timer(&self, bridge: &BridgeHandle, args: &Args<'_>) -> Result<(), InvocationError> {
        let id: u64 = args.get(0)?;
        let duration_ms: f64 = args.get(1)?;
        let repeats = args.optional::<bool>(3)?.unwrap_or(false);

        let mut duration = Duration::try_from_secs_f64(duration_ms.max(0.0) / 1000.0)
            .map_err(|e| args.reject(format!("timer {id} has an invalid duration: {e}")))?;

        if duration.is_zero() && !repeats {
            call_timers(bridge, id);
            return Ok(());
        }
        if repeats {
            duration = duration.max(MIN_REPEAT);
        }

        let generation = self.generation.get() + 1;
        self.generation.set(generation);
        self.timers.borrow_mut().insert(id, generation);
        trace!("Timer {id} scheduled in {duration:?} (repeats: {repeats})");

        let timers = Rc::clone(&self.timers);
        let timer_bridge = bridge.clone();
        bridge.schedule(async move {
            loop {
                tokio::time::sleep(duration).await;
                if timers.borrow().get(&id) != Some(&generation) {
                    break;
                }
                call_timers(&timer_bridge, id);
                if !repeats {
                    timers.borrow_mut().remove(&id);
                    break;
                }
            }
        });

        Ok(())
    }

    fn delete_timer(&self, args: &Args<'_>) -> Result<(), InvocationError> {
        let id: u64 = args.get(0)?;
        self.timers.borrow_mut().remove(&id);
        Ok(())
    }
}

fn call_timers(bridge: &BridgeHandle, id: u64) {
    bridge.enqueue_js_call("JSTimersExecution", "callTimers", vec![json!([id])]);
}

impl NativeModule for Timing {
    fn name(&self) -> &str {
        "RCTTiming"
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
            "createTimer" => self.create_timer(bridge, args),
            "deleteTimer" => self.delete_timer(args),
            other => Err(args.reject(format!("unknown method {other}"))),
        }
    }
}
