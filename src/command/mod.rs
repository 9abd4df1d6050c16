pub mod host;
pub mod proxy;
