mod api;
mod client;
mod endpoints;
mod metrics;
mod profile_id;
mod types;

pub use api::Aoe4Api;
pub use client::Aoe4Client;
pub use metrics::RequestMetrics;
pub use profile_id::ProfileId;
pub use types::*;
