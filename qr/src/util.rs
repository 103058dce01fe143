pub mod tracing_wrappers;
