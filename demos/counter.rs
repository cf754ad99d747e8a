//! Counter store with actions kept in the state and two bindings.
//!
//! Run with `RUST_LOG=slicestore=debug` to watch subscriptions come and go.

use slicestore::{Binding, Func, Record, Selector, Store, Value};
use tracing_subscriber::EnvFilter;

fn main() -> slicestore::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Counter Store ===\n");

    let store = Store::create(|api| {
        let inc = api.clone();
        let step = api.clone();
        Value::from(
            Record::new()
                .with("count", 0)
                .with("step", 1)
                .with(
                    "increment",
                    Func::new(move |_| {
                        inc.merge_with(|s| {
                            let count = s.get("count").and_then(Value::as_int).unwrap_or(0);
                            let step = s.get("step").and_then(Value::as_int).unwrap_or(1);
                            Record::from([("count", count + step)])
                        })?;
                        Ok(Value::Null)
                    }),
                )
                .with(
                    "set_step",
                    Func::new(move |args| {
                        let n = args.first().and_then(Value::as_int).unwrap_or(1);
                        step.merge([("step", n)])?;
                        Ok(Value::Null)
                    }),
                ),
        )
    })?;

    // Only re-renders when the count changes.
    let count_view = Binding::new(&store, Selector::field("count"), |count| {
        println!("   [count view] count = {:?}", count.as_int());
    });
    // Re-renders when either count or step changes.
    let _summary_view = Binding::new(&store, Selector::pick(["count", "step"]), |slice| {
        println!("   [summary view] {}", slice.to_json());
    });

    let state = store.get_state();
    let increment = state.get("increment").cloned().unwrap_or_default();
    let set_step = state.get("set_step").cloned().unwrap_or_default();

    println!("1. Increment twice");
    increment.call(&[])?;
    increment.call(&[])?;

    println!("\n2. Change the step to 5 (count view stays quiet)");
    set_step.call(&[Value::from(5)])?;

    println!("\n3. Increment once more");
    increment.call(&[])?;

    println!("\nFinal count: {:?}", count_view.slice().as_int());
    println!("Final state: {}", store.get_state().to_json());
    Ok(())
}
