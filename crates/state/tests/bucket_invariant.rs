//! Bucket/term parity under arbitrary action sequences

use mircs_core::Record;
use mircs_search::{classify_all, Bucket};
use mircs_state::UiStore;
use proptest::prelude::*;
use serde_json::json;

#[derive(Debug, Clone)]
enum Action {
    Add(u8),
    Remove(u8),
    Set(Vec<u8>),
    Highlight(bool),
    Push(u8),
    Classify,
    ResetFound,
    Reset,
}

fn action() -> impl Strategy<Value = Action> {
    prop_oneof![
        (0u8..6).prop_map(Action::Add),
        (0u8..6).prop_map(Action::Remove),
        prop::collection::vec(0u8..6, 0..5).prop_map(Action::Set),
        any::<bool>().prop_map(Action::Highlight),
        (0u8..8).prop_map(Action::Push),
        Just(Action::Classify),
        Just(Action::ResetFound),
        Just(Action::Reset),
    ]
}

fn records() -> Vec<Record> {
    (0..6)
        .map(|i| Record::from_json(json!({"_id": i.to_string(), "k": format!("t{}", i % 3)})).unwrap())
        .collect()
}

proptest! {
    #[test]
    fn buckets_track_terms(actions in prop::collection::vec(action(), 0..40)) {
        let store = UiStore::new();
        let records = records();

        for action in actions {
            let before = store.snapshot().search_strings.len();
            match action {
                Action::Add(t) => {
                    let added = store.add_search_term(&format!("t{}", t));
                    let after = store.snapshot().search_strings.len();
                    prop_assert_eq!(after, before + usize::from(added));
                }
                Action::Remove(t) => {
                    let removed = store.remove_search_term(&format!("t{}", t));
                    let after = store.snapshot().search_strings.len();
                    prop_assert_eq!(after + usize::from(removed), before);
                }
                Action::Set(ts) => {
                    store.set_search_terms(ts.iter().map(|t| format!("t{}", t)).collect());
                }
                Action::Highlight(on) => {
                    store.set_highlight_field(on.then_some("k"), &records);
                }
                Action::Push(i) => {
                    store.push_found_record(Bucket::Found(usize::from(i)), records[0].clone());
                }
                Action::Classify => {
                    let terms = store.search_strings();
                    prop_assert!(store.apply_classification(classify_all(&records, &terms)));
                }
                Action::ResetFound => store.reset_found_records(),
                Action::Reset => store.reset(),
            }

            let s = store.snapshot();
            prop_assert_eq!(s.found_records.len(), s.search_strings.len());
        }
    }
}
