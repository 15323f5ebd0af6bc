pub mod backoff;
pub mod config;
pub mod enricher;
pub mod events;
pub mod notifier;
pub mod novelty;
pub mod orders;
pub mod query;
pub mod repository;
pub mod rpc;
pub mod scanner;
