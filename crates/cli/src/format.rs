//! Output → human/json string formatting.
//!
//! Two modes:
//! - **Human** (default): one line per item, a map description for `View`
//! - **JSON** (`--json`): `serde_json::to_string_pretty`

use mircs_explorer::{
    Bounds, DataSet, Error, ExplorerView, LatLng, OpenSummary, Output, Relationship, ViewSource,
};

/// Output formatting mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

/// Format a successful output.
pub fn format_output(output: &Output, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => serde_json::to_string_pretty(output)
            .unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e)),
        OutputMode::Human => format_human(output),
    }
}

/// Format an error.
pub fn format_error(err: &Error, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => serde_json::to_string_pretty(&serde_json::json!({
            "error": format!("{}", err)
        }))
        .unwrap_or_else(|_| format!("{{\"error\": \"{}\"}}", err)),
        OutputMode::Human => format!("(error) {}", err),
    }
}

/// Whether a step of a command sequence is worth printing
pub fn is_reportable(output: &Output) -> bool {
    !matches!(output, Output::Unit | Output::Bool(_))
}

// =========================================================================
// Human
// =========================================================================

fn format_human(output: &Output) -> String {
    match output {
        Output::Unit => "OK".to_string(),
        Output::Bool(b) => format!("(boolean) {}", b),
        Output::DataSets(sets) if sets.is_empty() => "(no datasets)".to_string(),
        Output::DataSets(sets) => lines(sets.iter().map(data_set_line)),
        Output::Relationships(rels) if rels.is_empty() => "(no relationships)".to_string(),
        Output::Relationships(rels) => lines(rels.iter().map(relationship_line)),
        Output::DataSet(ds) => data_set_line(ds),
        Output::Relationship(rel) => relationship_line(rel),
        Output::Opened(summary) => format_opened(summary),
        Output::Refreshed(r) => format!(
            "{} mapped, {} without location, {} matched, {} linked\nbounds: {}",
            r.mapped,
            r.skipped,
            r.matched,
            r.linked,
            bounds(r.fitted.as_ref())
        ),
        Output::View(view) => format_view(view),
        Output::SignedIn {
            email,
            expires_in_ms,
            ..
        } => format!(
            "Signed in as {} (token valid for {} min)",
            email,
            expires_in_ms / 60_000
        ),
    }
}

fn lines(items: impl Iterator<Item = String>) -> String {
    items.collect::<Vec<_>>().join("\n")
}

fn data_set_line(ds: &DataSet) -> String {
    if ds.description.is_empty() {
        format!("{}\t{}", ds.id, ds.name)
    } else {
        format!("{}\t{}\t{}", ds.id, ds.name, ds.description)
    }
}

fn relationship_line(rel: &Relationship) -> String {
    let sets = rel
        .data_sets
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(" -> ");
    let keys = rel
        .join_elements
        .iter()
        .map(|e| format!("{}={}", e.left, e.right))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{}\t{}\t{}\t[{}]", rel.id, rel.name, sets, keys)
}

fn format_opened(summary: &OpenSummary) -> String {
    let mut out = vec![format!(
        "{} records, {} mapped",
        summary.records, summary.mapped
    )];
    for (id, count) in &summary.related {
        out.push(format!("related {}: {} records", id, count));
    }
    out.push(format!("bounds: {}", bounds(summary.fitted.as_ref())));
    out.join("\n")
}

fn format_view(view: &ExplorerView) -> String {
    let mut out = Vec::new();
    out.push(match &view.source {
        Some(ViewSource::DataSet(id)) => format!("dataset: {}", id),
        Some(ViewSource::Relationship(id)) => format!("relationship: {}", id),
        None => "(nothing open)".to_string(),
    });
    out.push(format!("tiles: {}", view.tile_layer));
    if let Some(field) = &view.filter_bar.highlight_field {
        out.push(format!("highlight: {}", field));
    }
    for chip in &view.filter_bar.chips {
        match &chip.colour {
            Some(colour) => out.push(format!("chip: {} {}", chip.label, colour)),
            None => out.push(format!("chip: {}", chip.label)),
        }
    }
    out.push(format!("other: {}", view.filter_bar.other_count));
    out.push(format!("markers: {}", view.markers.len()));
    for m in &view.markers {
        out.push(format!(
            "  #{} {} {} {}",
            m.layer.0,
            bucket(m.bucket.index()),
            m.point.map(point).unwrap_or_else(|| "(feature)".to_string()),
            m.popup.replace('\n', "; ")
        ));
    }
    out.push(format!("bounds: {}", bounds(view.bounds.as_ref())));
    if !view.side_panel.cards.is_empty() {
        out.push(view.side_panel.heading.clone());
    }
    out.join("\n")
}

fn bucket(index: Option<usize>) -> String {
    match index {
        Some(i) => format!("[{}]", i + 1),
        None => "[other]".to_string(),
    }
}

fn point(p: LatLng) -> String {
    format!("{:.5},{:.5}", p.lat, p.lng)
}

fn bounds(b: Option<&Bounds>) -> String {
    match b {
        Some(b) => format!("{} .. {}", point(b.south_west), point(b.north_east)),
        None => "(none)".to_string(),
    }
}
