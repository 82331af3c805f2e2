pub mod config;
pub mod logging;

pub mod events;
pub mod frame;
pub mod monitor;
pub mod progress;
pub mod scheduler;
pub mod select;
pub mod session;
pub mod transport;
