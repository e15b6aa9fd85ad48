pub mod config;
pub mod error;
pub mod kitchen;
pub mod loader;
pub mod progress;
pub mod scheduler;
pub mod shutdown;
pub mod station;

pub use kitchen::Kitchen;
