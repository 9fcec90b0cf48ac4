pub mod adapters;
pub mod aggregator;
pub mod config;
pub mod error;
pub mod fetch;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod resolve;
pub mod stations;
