//! Graph representation and algorithms module

pub mod algorithms;
pub mod builder;
pub mod interaction;
pub mod projection;

pub use builder::{build_graph, BuildOptions, GraphBuilder};
pub use interaction::{Interaction, InteractionGraph};
pub use projection::WeightedProjection;
