//! Port traits: the boundaries between domain logic and the outside world.

pub mod clock_port;
pub mod config_port;
pub mod price_port;
pub mod report_port;
pub mod report_source_port;
pub mod store_port;
