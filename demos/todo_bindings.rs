//! Todo list state with a filter, shown through shallow-diffed bindings.

use serde_json::json;
use slicestore::{Binding, Record, Selector, Store, Value};

fn visible_todos(state: &Record) -> Value {
    let filter = state.get("filter").and_then(Value::as_str).unwrap_or("all");
    let todos = state.get("todos").and_then(Value::as_list);
    let visible: Vec<Value> = todos
        .map(|list| {
            list.iter()
                .filter(|todo| {
                    let done = todo
                        .as_record()
                        .and_then(|t| t.get("done"))
                        .and_then(Value::as_bool)
                        .unwrap_or(false);
                    match filter {
                        "done" => done,
                        "active" => !done,
                        _ => true,
                    }
                })
                .cloned()
                .collect()
        })
        .unwrap_or_default();
    Value::from(Record::new().with("filter", filter).with("count", visible.len() as i64))
}

fn main() -> slicestore::Result<()> {
    println!("=== Todo Bindings ===\n");

    let store = Store::new(Record::from(json!({
        "todos": [],
        "filter": "all",
        "title": "My list",
    })));

    let _visible = Binding::new(&store, Selector::new(visible_todos), |slice| {
        println!("   [visible] {}", slice.to_json());
    });
    let _title = Binding::new(&store, Selector::field("title"), |title| {
        println!("   [title] {}", title.to_json());
    });

    println!("Adding todos...");
    store.merge(json!({
        "todos": [
            {"text": "Write the store", "done": true},
            {"text": "Write the bindings", "done": false},
        ]
    }))?;

    println!("\nFiltering to active...");
    store.merge([("filter", "active")])?;

    println!("\nRenaming the list...");
    store.merge([("title", "Weekend")])?;

    println!("\nFinal state: {:#}", store.get_state().to_json());
    Ok(())
}
