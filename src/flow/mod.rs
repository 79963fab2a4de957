//! Interaction flow of the category search
//!
//! - `transition`: pure classification and `(state, input)` dispatch
//! - `presentation`: text composition, label emphasis and recipe sampling
//! - `reply`: outbound message model and the `ReplySink` channel seam
//! - `controller`: orchestration of the directory, translator and store

pub mod controller;
pub mod presentation;
pub mod reply;
pub mod transition;

pub use controller::{FlowController, FlowDependencies, FlowSettings, IncomingMessage};
pub use reply::{Reply, ReplySink, SuggestedReplies, TextFormat};
pub use transition::{Action, Input};
