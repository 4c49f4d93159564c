pub mod config;
pub mod error;
pub mod logging;
pub mod network;
pub mod scan;
pub mod system;
pub mod vendors;
