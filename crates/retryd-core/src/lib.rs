pub mod config;
pub mod logging;

pub mod clock;
pub mod dispatch;
pub mod headers;
pub mod inbound;
pub mod processor;
pub mod producer;
pub mod queue;
pub mod record;
pub mod retry;
pub mod service;
pub mod store;
