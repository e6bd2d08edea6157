pub mod api;
pub mod command;
pub mod config;
pub mod engine;
pub mod limits;
pub mod model;
pub mod notify;
pub mod observability;
pub mod reserved;
pub mod session;
pub mod submit;
pub mod view;
