//! Host a tiny calculator and call it through a traced client pipeline.
//!
//! Run with:
//!   cargo run -p simplerpc --example calc-roundtrip

use std::sync::Arc;

use simplerpc::channel::{
    client_trace_stage, ClientPipeline, DispatchError, InvocationResult, Listener,
    ListenerConfig, ServerPipeline, ServiceTable, TypedValue,
};

fn calc(method: &str, args: &[TypedValue]) -> Result<InvocationResult, DispatchError> {
    let a = args.first().and_then(TypedValue::as_i32).unwrap_or(0);
    let b = args.get(1).and_then(TypedValue::as_i32).unwrap_or(0);
    match method {
        "Add" => Ok(InvocationResult::returning(a.wrapping_add(b))),
        "Mul" => Ok(InvocationResult::returning(a.wrapping_mul(b))),
        other => Err(format!("{other} is not supported").into()),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let table = Arc::new(ServiceTable::new().with_object("Calc", calc));
    let pipeline = ServerPipeline::builder(table.clone(), table).build()?;
    let listener = Listener::new(ListenerConfig::new("127.0.0.1", 0), pipeline);
    listener.start()?;

    let url = listener.url_for("Calc").ok_or("listener is not bound")?;
    eprintln!("Serving Calc at {url}");

    let client = ClientPipeline::builder(&url)?
        .with_stage(client_trace_stage())
        .build()?;

    for (method, a, b) in [("Add", 2, 3), ("Mul", 6, 7), ("Pow", 2, 8)] {
        match client.call(method, &[a.into(), b.into()]).into_result() {
            Ok((value, _)) => eprintln!("{method}({a}, {b}) = {value}"),
            Err(fault) => eprintln!("{method}({a}, {b}) failed: {fault}"),
        }
    }

    listener.stop();
    Ok(())
}
