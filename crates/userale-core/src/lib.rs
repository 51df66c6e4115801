pub mod api;
pub mod buffer;
pub mod config;
pub mod context;
pub mod details;
pub mod handlers;
pub mod packager;
pub mod resolver;
pub mod sender;
pub mod time;

pub use userale_common::error;
pub use userale_common::protocol;

/// Version stamped into every record as `useraleVersion`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
