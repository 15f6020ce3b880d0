//! Infrastructure layer - AWS-backed implementations and the services built on them

pub mod assistant;
pub mod aws;
pub mod knowledge_base;
pub mod llm;
pub mod logging;
pub mod parameter_store;
pub mod services;
