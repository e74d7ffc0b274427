pub mod config;
pub mod crawler;
pub mod dataset;
pub mod fetch;
pub mod harvest;
pub mod reshape;
pub mod store;
