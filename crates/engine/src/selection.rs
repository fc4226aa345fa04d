//! Selection expansion
//!
//! Clicking a marker selects every record at that location: for a joined
//! composite, all left matches then all right matches; for any other
//! record, the record itself then everything linked to its `_id`.

use mircs_core::Record;

use crate::join::LinkMap;

/// Records surfaced by selecting `record`.
pub fn expand_selection(record: &Record, link_map: &LinkMap) -> Vec<Record> {
    match record {
        Record::Joined(joined) => joined.iter().cloned().collect(),
        Record::Flat(_) | Record::Geo(_) => {
            let mut records = vec![record.clone()];
            if let Some(id) = record.id() {
                records.extend(link_map.get(&id).iter().cloned().map(Record::Flat));
            }
            records
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::join::resolve_join;
    use mircs_core::JoinElement;
    use serde_json::json;

    fn rec(v: serde_json::Value) -> Record {
        Record::from_json(v).unwrap()
    }

    #[test]
    fn test_joined_selection_is_left_then_right() {
        let r = rec(json!({"data": [[{"n": 1}, {"n": 2}], [{"n": 3}]]}));
        let selected = expand_selection(&r, &LinkMap::new());
        let ns: Vec<_> = selected.iter().map(|r| r.get("n").cloned()).collect();
        assert_eq!(ns, vec![Some(json!(1)), Some(json!(2)), Some(json!(3))]);
    }

    #[test]
    fn test_flat_selection_includes_links() {
        let left = vec![rec(json!({"_id": "a", "k": 1}))];
        let right = vec![rec(json!({"fk": 1, "v": "x"})), rec(json!({"fk": 1, "v": "y"}))];
        let map = resolve_join(&left, &right, &[JoinElement::new("k", "fk")]);
        let selected = expand_selection(&left[0], &map);
        assert_eq!(selected.len(), 3);
        assert_eq!(selected[0], left[0]);
        assert_eq!(selected[2].get("v"), Some(&json!("y")));
    }

    #[test]
    fn test_flat_without_id_selects_itself() {
        let r = rec(json!({"v": 1}));
        assert_eq!(expand_selection(&r, &LinkMap::new()), vec![r]);
    }
}
