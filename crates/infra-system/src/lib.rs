// Robot Master Infrastructure - System Adapters
// Implements: GraphSource (process-graph documents on disk)

pub mod file_graph_source;

pub use file_graph_source::FileGraphSource;
