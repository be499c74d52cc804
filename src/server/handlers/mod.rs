//! API handlers.

mod connections;
mod health;
mod ip_info;
mod metrics;

pub use connections::connections_handler;
pub use health::health_handler;
pub use ip_info::ip_info_handler;
pub use metrics::metrics_handler;
