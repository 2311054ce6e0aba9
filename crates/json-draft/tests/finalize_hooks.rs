use std::cell::RefCell;
use std::rc::Rc;

use json_draft::{DraftError, Hooks, Producer, ProducerConfig, Strategy, Value};
use serde_json::json;

fn recording_producer(strategy: Strategy, log: &Rc<RefCell<Vec<String>>>) -> Producer {
    let (on_assign, on_delete, on_copy) = (log.clone(), log.clone(), log.clone());
    let hooks = Hooks::new()
        .on_assign(move |_, key, value| {
            on_assign.borrow_mut().push(format!("assign {key}={value}"));
        })
        .on_delete(move |_, key| {
            on_delete.borrow_mut().push(format!("delete {key}"));
        })
        .on_copy(move |draft| {
            on_copy.borrow_mut().push(format!("copy {}", draft.path().len()));
        });
    Producer::new(
        ProducerConfig::default()
            .with_auto_freeze(true)
            .with_strategy(strategy),
    )
    .with_hooks(hooks)
}

#[test]
fn hooks_fire_children_first_in_order() {
    for strategy in [Strategy::Trap, Strategy::Accessor] {
        let log = Rc::new(RefCell::new(Vec::new()));
        let producer = recording_producer(strategy, &log);
        let base = Value::from(json!({"a": 1, "b": 2, "c": {"d": 1}}));
        producer
            .produce(&base, |d| {
                let d = d.draft()?;
                d.set("a", 10)?;
                d.delete("b")?;
                d.child("c")?.set("d", 2)?;
                Ok::<_, DraftError>(None)
            })
            .expect("produce must succeed");
        assert_eq!(
            *log.borrow(),
            [
                "assign d=2",
                "copy 1",
                "assign a=10",
                "assign c={\"d\":2}",
                "delete b",
                "copy 0",
            ],
            "{strategy:?}"
        );
    }
}

#[test]
fn hooks_stay_quiet_without_changes() {
    for strategy in [Strategy::Trap, Strategy::Accessor] {
        let log = Rc::new(RefCell::new(Vec::new()));
        let producer = recording_producer(strategy, &log);
        let base = Value::from(json!({"a": {"b": 1}}));
        let next = producer
            .produce(&base, |d| {
                d.draft()?.child("a")?.get("b")?;
                Ok::<_, DraftError>(None)
            })
            .expect("produce must succeed");
        assert!(next.is(&base));
        assert!(log.borrow().is_empty(), "{strategy:?}: {:?}", log.borrow());
    }
}

#[test]
fn array_growth_reports_new_indices() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let producer = recording_producer(Strategy::Trap, &log);
    let base = Value::from(json!([1]));
    producer
        .produce(&base, |d| {
            d.draft()?.push(2)?;
            Ok::<_, DraftError>(None)
        })
        .expect("produce must succeed");
    assert_eq!(*log.borrow(), ["assign 1=2", "copy 0"]);
}
