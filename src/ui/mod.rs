pub mod graph;
pub mod icons;
pub mod pipeline;

pub use graph::render_graph;
pub use pipeline::render_plan;
