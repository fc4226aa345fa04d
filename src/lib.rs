//! MIRCS - explore related datasets on a map
//!
//! Datasets live on a persistence server; relationships pair two datasets
//! through ordered `[leftField, rightField]` join elements. Opening a
//! dataset fetches its records and every related dataset, links matching
//! records client-side and draws the located ones as markers coloured by
//! the active search terms.
//!
//! # Quick Start
//!
//! ```ignore
//! use mircs::{Command, Explorer, ExplorerConfig, Output, RecordingCanvas};
//!
//! let mut explorer = Explorer::connect(ExplorerConfig::default());
//! explorer.mount(Box::new(RecordingCanvas::new()))?;
//!
//! explorer.execute(Command::OpenDataSet { id: "people".into() })?;
//! explorer.execute(Command::AddSearchTerm { term: "Surname: Smith".into() })?;
//! if let Output::View(view) = explorer.execute(Command::View)? {
//!     println!("{} markers", view.markers.len());
//! }
//! ```
//!
//! # Architecture
//!
//! All operations go through [`Explorer::execute`], which takes a
//! serializable [`Command`] and returns an [`Output`]. The join, search,
//! state and map layers are separate crates and are not re-exported here.

pub use mircs_explorer::*;
