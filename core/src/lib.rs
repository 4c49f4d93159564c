pub mod aggregator;
pub mod network;
pub mod probe;
pub mod scanner;
pub mod system;
pub mod vendors;

#[cfg(test)]
mod testing;
