// src/registry/mod.rs

//! Service registry: the static dependency graph.
//!
//! - [`graph`] builds and validates the graph from program declarations.
//! - [`service`] defines service nodes, edges and their resolution marker.

pub mod graph;
pub mod service;

pub use graph::ServiceGraph;
pub use service::{DependencyEdge, Resolution, Service, ServiceId};
