//! Request middleware: tracing spans and request/error counters.

pub mod metrics;
pub mod tracing_layer;
