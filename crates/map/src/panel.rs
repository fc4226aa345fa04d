//! Side panel and filter bar views
//!
//! Pure projections of a [`UiState`] snapshot. Nothing is cached: every
//! count comes from bucket lengths at the time of projection.

use mircs_search::{chips, other_count, pie_slices, record_card, CardLine, Chip, PieSlice, SearchTerm};
use mircs_state::UiState;
use serde::Serialize;

/// Pie chart of the highlight field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PieChart {
    /// Chart title, the highlight field
    pub field: String,
    /// Slices, "Other" last
    pub slices: Vec<PieSlice>,
}

/// Filter bar contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterBar {
    /// One chip per search term
    pub chips: Vec<Chip>,
    /// Records not shown in a styled bucket
    pub other_count: usize,
    /// Options for the highlight field selector
    pub field_names: Vec<String>,
    /// Current highlight field
    pub highlight_field: Option<String>,
}

impl FilterBar {
    /// Project the filter bar from `state`
    pub fn from_state(state: &UiState) -> Self {
        let counts = state.bucket_counts();
        FilterBar {
            chips: chips(&state.search_strings, &counts),
            other_count: other_count(state.other_records.len(), &counts),
            field_names: state.field_names.clone(),
            highlight_field: state.highlight_field.clone(),
        }
    }
}

/// Side panel contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SidePanel {
    /// Present only while a highlight field is set
    pub pie_chart: Option<PieChart>,
    /// Heading line
    pub heading: String,
    /// One card per selected record
    pub cards: Vec<Vec<CardLine>>,
}

impl SidePanel {
    /// Project the side panel from `state`
    pub fn from_state(state: &UiState) -> Self {
        let pie_chart = state.highlight_field.as_ref().map(|field| PieChart {
            field: field.clone(),
            slices: pie_slices(
                &state.search_strings,
                &state.bucket_counts(),
                state.other_records.len(),
            ),
        });

        if state.selected.records.is_empty() {
            return SidePanel {
                pie_chart,
                heading: "Select a location for more detail.".to_string(),
                cards: Vec::new(),
            };
        }

        let terms = SearchTerm::parse_all(&state.search_strings);
        SidePanel {
            pie_chart,
            heading: format!(
                "{} records at selected location.",
                state.selected.records.len()
            ),
            cards: state
                .selected
                .records
                .iter()
                .map(|record| record_card(record, &terms))
                .collect(),
        }
    }
}
