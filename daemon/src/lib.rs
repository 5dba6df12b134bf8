//! cpu-shield: host-local CPU guardian

pub mod collector;
pub mod config;
pub mod error;
pub mod escalation;
pub mod executor;
pub mod hibernation;
pub mod mitigation;
pub mod notifier;
pub mod ranker;
pub mod report;
pub mod sampler;
pub mod session;
pub mod whitelist;
