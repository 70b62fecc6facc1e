//! HTTP clients for remote log transport

pub mod cloud;

pub use cloud::{CloudLogClient, CloudLogClientBuilder, CloudLogClientConfig};
