//! HTTP API endpoints

pub mod demo;
pub mod health;
pub mod pipeline;
pub mod sse;

pub use demo::demo_routes;
pub use health::health_routes;
pub use pipeline::pipeline_routes;
pub use sse::event_stream;
