//! Full bridge round trips: engine, real runtime, application bundle

use std::io::Write;

use bridge_core::{BridgeEngine, BridgeState, Rendezvous};
use serde_json::json;
use serial_test::serial;
use url::Url;

use crate::DenoChannel;

const BUNDLE: &str = r#"
AppRegistry.registerComponent("App", () => (props, rootTag) => {
  const { UIManager } = NativeModules;
  UIManager.createView(2, "RCTView", rootTag, { testID: props.name });
  UIManager.createView(3, "RCTRawText", rootTag, { text: "hello" });
  UIManager.setChildren(2, [3]);
  UIManager.setChildren(rootTag, [2]);
  setTimeout(() => UIManager.updateView(3, "RCTRawText", { text: "later" }), 10);
});
"#;

fn bundle_file(source: &str) -> (tempfile::NamedTempFile, Url) {
    let mut file = tempfile::NamedTempFile::new().expect("Should create a temp file");
    file.write_all(source.as_bytes())
        .expect("Should write the bundle");
    let url = Url::from_file_path(file.path()).expect("Temp paths are absolute");
    (file, url)
}

fn engine(url: Url) -> BridgeEngine {
    BridgeEngine::builder(DenoChannel::new().expect("Should spawn the runtime thread"))
        .bundle_url(url)
        .network_client(reqwest::Client::new())
        .rendezvous(Rendezvous::immediate())
        .build()
}

#[tokio::test]
#[serial]
async fn test_bundle_renders_into_the_ui_manager() {
    let (_file, url) = bundle_file(BUNDLE);
    let mut engine = engine(url);

    engine.init().await.expect("Should initialize");
    engine.run_until_idle().await;
    assert_eq!(engine.state(), BridgeState::SteadyState);

    let ui = engine.ui_manager().clone();
    let root = ui.add_root_view();
    ui.run_application("App", root, json!({"name": "demo"}))
        .expect("UIManager is attached");
    engine.run_until_idle().await;

    assert_eq!(
        ui.snapshot(),
        json!([{
            "tag": root,
            "className": "RCTRootView",
            "props": {},
            "children": [{
                "tag": 2,
                "className": "RCTView",
                "props": {"testID": "demo"},
                "children": [{
                    "tag": 3,
                    "className": "RCTRawText",
                    "props": {"text": "later"},
                    "children": []
                }]
            }]
        }])
    );
}

#[tokio::test]
#[serial]
async fn test_script_reads_its_own_source() {
    let bundle = r"
        NativeModules.SourceCode.getScriptText(
          (result) => { globalThis.scriptText = result.text; },
          (error) => { globalThis.scriptText = error.message; },
        );
    ";
    let (_file, url) = bundle_file(bundle);
    let channel = DenoChannel::new().expect("Should spawn the runtime thread");
    let mut engine = BridgeEngine::builder(channel.clone())
        .bundle_url(url.clone())
        .network_client(reqwest::Client::new())
        .rendezvous(Rendezvous::immediate())
        .build();

    engine.init().await.expect("Should initialize");
    engine.run_until_idle().await;

    let url_constant = channel
        .evaluate("NativeModules.SourceCode.scriptURL".to_string())
        .await
        .expect("Should read the constant");
    assert_eq!(url_constant, json!(url.as_str()));

    let text = channel
        .evaluate("globalThis.scriptText".to_string())
        .await
        .expect("Should read the global");
    assert_eq!(text, json!(bundle));
}

#[tokio::test]
#[serial]
async fn test_failing_bundle_never_gets_ready() {
    let (_file, url) = bundle_file("throw new Error('boom');");
    let mut engine = engine(url);

    engine.init().await.expect("Should initialize");
    engine.run_until_idle().await;

    assert!(!engine.is_ready());
    assert_eq!(engine.state(), BridgeState::ScriptExecuting);
}

#[tokio::test]
#[serial]
async fn test_bundle_completion_value_is_ignored() {
    // Neither a BigInt nor a self-referencing object has a JSON form
    for tail in ["10n", "const store = {}; store.self = store; store"] {
        let bundle = format!("{BUNDLE}\n{tail}");
        let (_file, url) = bundle_file(&bundle);
        let mut engine = engine(url);

        engine.init().await.expect("Should initialize");
        engine.run_until_idle().await;

        assert!(engine.is_ready(), "bundle ending in `{tail}` should get ready");
    }
}
