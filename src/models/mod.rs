pub mod auth;
pub mod bootstrap;
pub mod command;
pub mod connection;
pub mod forwarding;

// Re-export main types
pub use auth::AuthMethod;
pub use bootstrap::{BootstrapConfig, BootstrapPhase, BootstrapReport};
pub use command::CommandResult;
pub use connection::ConnectionParameters;
pub use forwarding::ForwardingRule;
