pub mod benefits;
pub mod catalog;
pub mod clock;
pub mod command;
pub mod commit;
pub mod config;
pub mod context;
pub mod effects;
pub mod engine;
pub mod error;
pub mod escalation;
pub mod event;
pub mod flags;
pub mod forms;
pub mod message;
pub mod rng;
pub mod selector;
pub mod session;
pub mod snapshot;
pub mod state;
pub mod store;
pub mod subsystem;
pub mod support;
pub mod trigger;
pub mod types;
