//! Text highlighting
//!
//! Splits a displayed field value into plain and highlighted segments.
//! Substring terms highlight every case-insensitive occurrence; a
//! `field: value` term highlights its value only on lines for that field.
//! Where terms overlap, the earlier term keeps the characters.

use serde::{Deserialize, Serialize};

use crate::term::SearchTerm;

/// A run of displayed text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// The text of the run
    pub text: String,
    /// Index of the highlighting term, `None` for plain text
    pub term: Option<usize>,
}

impl Segment {
    fn new(text: String, term: Option<usize>) -> Self {
        Segment { text, term }
    }
}

/// Split `value`, displayed under `field`, into highlighted segments.
pub fn highlight_segments(field: &str, value: &str, terms: &[SearchTerm]) -> Vec<Segment> {
    let chars: Vec<char> = value.chars().collect();
    let mut owner: Vec<Option<usize>> = vec![None; chars.len()];

    for (index, term) in terms.iter().enumerate() {
        let needle: Vec<char> = match term {
            SearchTerm::Text { text, .. } => text.chars().collect(),
            SearchTerm::Field { field: f, value: v } if f == field => v.chars().collect(),
            SearchTerm::Field { .. } => continue,
        };
        if needle.is_empty() || needle.len() > chars.len() {
            continue;
        }
        let mut start = 0;
        while start + needle.len() <= chars.len() {
            let window = &chars[start..start + needle.len()];
            let free = owner[start..start + needle.len()].iter().all(Option::is_none);
            if free && eq_ignore_case(window, &needle) {
                for slot in &mut owner[start..start + needle.len()] {
                    *slot = Some(index);
                }
                start += needle.len();
            } else {
                start += 1;
            }
        }
    }

    let mut segments: Vec<Segment> = Vec::new();
    for (c, term) in chars.into_iter().zip(owner) {
        match segments.last_mut() {
            Some(last) if last.term == term => last.text.push(c),
            _ => segments.push(Segment::new(c.to_string(), term)),
        }
    }
    segments
}

fn eq_ignore_case(a: &[char], b: &[char]) -> bool {
    a.iter()
        .zip(b)
        .all(|(x, y)| x == y || x.to_lowercase().eq(y.to_lowercase()))
}
