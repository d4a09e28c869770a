//! Engine lifecycle: init, config injection, source loading, first flush, ready

use std::cell::Cell;
use std::io::Write;
use std::rc::Rc;
use std::time::Duration;

use serde_json::json;
use url::Url;

use super::{BUNDLE_URL, Event, ScriptedChannel, StaticSource, bundle_url, test_builder};
use crate::wire::{CONFIG_GLOBAL, DISPATCHER, FLUSHED_QUEUE};
use crate::{BridgeEngine, BridgeError, BridgeState, Rendezvous};

fn first_flush() -> Event {
    Event::Call(DISPATCHER.to_string(), FLUSHED_QUEUE.to_string(), vec![])
}

#[tokio::test]
async fn test_lifecycle_reaches_steady_state() {
    let channel = ScriptedChannel::new();
    let mut engine = test_builder(&channel).build();
    assert_eq!(engine.state(), BridgeState::Created);

    engine.init().await.expect("init should succeed");
    assert_eq!(engine.state(), BridgeState::SourceLoading);
    assert!(!engine.is_ready());

    engine.run_until_idle().await;

    assert_eq!(engine.state(), BridgeState::SteadyState);
    assert!(engine.is_ready());
    assert_eq!(
        channel.events(),
        vec![
            Event::Init,
            Event::Inject(CONFIG_GLOBAL.to_string()),
            Event::Script(bundle_url()),
            first_flush(),
        ]
    );
}

#[tokio::test]
async fn test_config_is_injected_before_the_script_runs() {
    let channel = ScriptedChannel::new();
    let mut engine = test_builder(&channel).build();
    engine.init().await.expect("init should succeed");

    let config = channel
        .injected(CONFIG_GLOBAL)
        .expect("config should be injected");
    let modules = config["remoteModuleConfig"]
        .as_object()
        .expect("remoteModuleConfig should be an object");

    let names: Vec<&str> = modules.keys().map(String::as_str).collect();
    assert_eq!(
        names,
        vec![
            "RCTTiming",
            "RCTNetworking",
            "RCTViewManager",
            "RCTRawTextManager",
            "RCTTextManager",
            "RCTImageViewManager",
            "SourceCode",
            "UIManager",
        ]
    );
    assert_eq!(modules["UIManager"]["moduleID"], json!(7));
    assert_eq!(
        modules["RCTTiming"]["methods"],
        json!({"createTimer": 0, "deleteTimer": 1})
    );
    assert!(
        !channel
            .events()
            .iter()
            .any(|e| matches!(e, Event::Script(_))),
        "script must not run before the loop is driven"
    );
}

#[tokio::test]
async fn test_ready_fires_exactly_once_after_the_script() {
    let channel = ScriptedChannel::new();
    let mut engine = test_builder(&channel).build();

    let fired = Rc::new(Cell::new(0));
    let observer_fired = Rc::clone(&fired);
    let observer_channel = channel.clone();
    engine.on_ready(move || {
        observer_fired.set(observer_fired.get() + 1);
        assert_eq!(
            observer_channel.events().last(),
            Some(&first_flush()),
            "ready must follow the first flush"
        );
    });

    engine.init().await.expect("init should succeed");
    engine.run_until_idle().await;
    assert_eq!(fired.get(), 1);

    // Later cycles do not fire again
    engine.enqueue_js_call("AppRegistry", "runApplication", vec![json!("App")]);
    channel.respond(json!(null));
    engine.run_until_idle().await;
    assert_eq!(fired.get(), 1);

    // Late observers are called immediately
    let late = Rc::new(Cell::new(false));
    let late_flag = Rc::clone(&late);
    engine.on_ready(move || late_flag.set(true));
    assert!(late.get());
}

#[tokio::test]
async fn test_first_flush_batch_is_dispatched_before_ready() {
    let channel = ScriptedChannel::new();
    let mut engine = test_builder(&channel).build();

    // RCTTiming.createTimer(3, 0, 0, false) fires immediately
    channel.respond(json!([[0], [0], [[3, 0, 0, false]]]));
    engine.init().await.expect("init should succeed");
    engine.run_until_idle().await;

    assert!(engine.is_ready());
    let calls = channel.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(
        calls[1].2,
        vec![json!("JSTimersExecution"), json!("callTimers"), json!([[3]])]
    );
}

#[tokio::test]
async fn test_failed_script_never_signals_ready() {
    let channel = ScriptedChannel::new();
    channel.fail_script();
    let mut engine = test_builder(&channel).build();

    engine.init().await.expect("init should succeed");
    engine.run_until_idle().await;

    assert!(!engine.is_ready());
    assert_eq!(engine.state(), BridgeState::ScriptExecuting);
    assert!(channel.calls().is_empty(), "no flush after a failed script");
}

#[tokio::test]
async fn test_channel_init_failure_is_reported() {
    let channel = ScriptedChannel::new();
    channel.fail_init();
    let mut engine = test_builder(&channel).build();

    let result = engine.init().await;

    assert!(matches!(result, Err(BridgeError::Channel(_))));
    assert_eq!(engine.state(), BridgeState::Initializing);
    assert!(channel.injected(CONFIG_GLOBAL).is_none());
}

#[tokio::test]
async fn test_missing_network_client_is_a_configuration_error() {
    let channel = ScriptedChannel::new();
    let mut engine = BridgeEngine::builder(channel.clone())
        .source_provider(Rc::new(StaticSource::new("")))
        .bundle_url(bundle_url())
        .rendezvous(Rendezvous::immediate())
        .build();

    let result = engine.init().await;
    assert!(
        matches!(result, Err(BridgeError::Configuration(_))),
        "got {result:?}"
    );
    assert_eq!(engine.state(), BridgeState::ConfigInjected);

    // Binding the missing collaborator lets the caller retry
    engine.set_network_client(reqwest::Client::new());
    engine.load_source().expect("retry should succeed");
    engine.run_until_idle().await;
    assert!(engine.is_ready());
}

#[tokio::test]
async fn test_missing_bundle_url_is_a_configuration_error() {
    let channel = ScriptedChannel::new();
    let mut engine = BridgeEngine::builder(channel.clone())
        .source_provider(Rc::new(StaticSource::new("")))
        .network_client(reqwest::Client::new())
        .rendezvous(Rendezvous::immediate())
        .build();

    let result = engine.init().await;
    assert!(matches!(result, Err(BridgeError::Configuration(_))));

    engine.set_bundle_url(Url::parse(BUNDLE_URL).expect("valid url"));
    engine.load_source().expect("retry should succeed");
    engine.run_until_idle().await;
    assert!(engine.is_ready());
}

#[tokio::test]
async fn test_init_twice_is_rejected() {
    let channel = ScriptedChannel::new();
    let mut engine = test_builder(&channel).build();

    engine.init().await.expect("init should succeed");
    let result = engine.init().await;

    assert!(matches!(result, Err(BridgeError::Configuration(_))));
    assert_eq!(
        channel
            .events()
            .iter()
            .filter(|e| **e == Event::Init)
            .count(),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn test_rendezvous_waits_for_the_minimum_delay() {
    let channel = ScriptedChannel::new();
    let mut engine = test_builder(&channel)
        .rendezvous(Rendezvous::default())
        .build();

    let start = tokio::time::Instant::now();
    engine.init().await.expect("init should succeed");
    engine.run_until_idle().await;

    assert!(engine.is_ready());
    // One delay before the script, one before the first flush
    assert!(start.elapsed() >= Rendezvous::DEFAULT_DELAY * 2);
    assert!(start.elapsed() < Rendezvous::DEFAULT_DELAY * 2 + Duration::from_millis(50));
}

#[tokio::test]
async fn test_application_script_is_read_from_a_file_url() {
    let mut bundle = tempfile::NamedTempFile::new().expect("temp file");
    write!(bundle, "AppRegistry.registerComponent('App', () => {{}});").expect("write");
    let url = Url::from_file_path(bundle.path()).expect("absolute path");

    let channel = ScriptedChannel::new();
    let mut engine = BridgeEngine::builder(channel.clone())
        .bundle_url(url.clone())
        .network_client(reqwest::Client::new())
        .rendezvous(Rendezvous::immediate())
        .build();

    engine.init().await.expect("init should succeed");
    engine.run_until_idle().await;

    assert!(engine.is_ready());
    assert!(channel.events().contains(&Event::Script(url.clone())));

    let config = channel.injected(CONFIG_GLOBAL).expect("config");
    assert_eq!(
        config["remoteModuleConfig"]["SourceCode"]["constants"]["scriptURL"],
        json!(url.as_str())
    );
}

#[tokio::test]
async fn test_run_until_stops_on_shutdown() {
    let channel = ScriptedChannel::new();
    let mut engine = test_builder(&channel).build();

    engine.init().await.expect("init should succeed");
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    engine.on_ready(move || {
        let _ = tx.send(());
    });
    engine
        .run_until(async {
            let _ = rx.await;
        })
        .await;

    assert!(engine.is_ready());
}
