//! Topology model: neighbor-driven link inference, the node/edge graph and
//! its layout.

mod graph;
mod inference;
mod layout;

pub use inference::LinkInference;
pub use layout::{force_layout, LayoutParams};
