use serde_json::{Value, json};

use crate::wire::{Batch, OutboundCall};

#[test]
fn test_outbound_calls_route_through_the_dispatcher() {
    let call = OutboundCall::dispatch("AppRegistry", "runApplication", vec![json!("App")]);
    assert_eq!(call.module, "BatchedBridge");
    assert_eq!(call.method, "callFunctionReturnFlushedQueue");
    assert_eq!(
        call.args,
        vec![json!("AppRegistry"), json!("runApplication"), json!(["App"])]
    );

    let callback = OutboundCall::callback(4, vec![json!(200), json!("ok")]);
    assert_eq!(callback.method, "invokeCallbackAndReturnFlushedQueue");
    assert_eq!(callback.args, vec![json!(4), json!([200, "ok"])]);

    let flush = OutboundCall::flush();
    assert_eq!(flush.method, "flushedQueue");
    assert!(flush.args.is_empty());
}

#[test]
fn test_batch_calls_are_positional() {
    let doc = json!([[3, 1], [0, 2], [["a"], []]]);
    let batch = Batch::decode(&doc).expect("valid").expect("not null");

    assert_eq!(batch.len(), 2);
    let calls: Vec<(usize, &Value, &Value, &Value)> = batch
        .calls()
        .map(|c| (c.index, c.module_id, c.method_id, c.params))
        .collect();
    assert_eq!(
        calls,
        vec![
            (0, &json!(3), &json!(0), &json!(["a"])),
            (1, &json!(1), &json!(2), &json!([])),
        ]
    );
}

#[test]
fn test_empty_batch_decodes() {
    let doc = json!([[], [], []]);
    let batch = Batch::decode(&doc).expect("valid").expect("not null");
    assert!(batch.is_empty());
}

#[test]
fn test_shape_errors_describe_the_problem() {
    let err = Batch::decode(&json!([[1], {"0": 1}, [[]]])).expect_err("object ids");
    assert!(
        err.to_string().contains("method ids should be an array, got an object"),
        "got: {err}"
    );

    let err = Batch::decode(&json!(true)).expect_err("not an array");
    assert!(err.to_string().contains("expected an array, got a boolean"));
}
