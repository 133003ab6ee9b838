pub mod app;
pub mod commands;
pub mod context;
pub mod diagnose;
pub mod dispatch;
pub mod env;
pub mod locate;
pub mod output;
pub mod runtime;
pub mod store;
pub mod validate;
