//! CLI command implementations.

pub mod build;
pub mod config;
pub mod init;
pub mod publish;
pub mod verify;

pub use build::build_site;
pub use config::config_get;
pub use init::init_project;
pub use publish::{publish_site, PublishOptions};
pub use verify::verify_site;
