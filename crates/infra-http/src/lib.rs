// Robot Master Infrastructure - HTTP Adapter
// Implements: TrackingService (workflow service REST API)

mod tracking_client;

pub use tracking_client::HttpTrackingService;
