// Services module
pub mod bootstrap;
pub mod config_service;
pub mod session;
pub mod validation_service;
