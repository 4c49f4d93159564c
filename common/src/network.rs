pub mod interface;
pub mod ports;
pub mod route;
pub mod target;
