//! Observable state for MIRCS map views
//!
//! - observe: listener registry and subscription handles
//! - ui: `UiStore`, the shared search/selection/tile state
//! - view: `ViewStore`, the records on display
//!
//! Stores are explicit objects passed by handle to every consumer. Each
//! consumer subscribes to the topics it depends on and drops its
//! subscriptions on teardown.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod observe;
pub mod ui;
pub mod view;

pub use observe::{Subscribers, Subscription};
pub use ui::{Selected, Topic, UiState, UiStore, DEFAULT_TILE_LAYER};
pub use view::{RelatedRecords, ViewChange, ViewData, ViewSource, ViewStore};
