pub mod config;
pub mod ensure;
pub mod http;
pub mod import;
pub mod package;
pub mod package_manager;
pub mod registry;
pub mod runtime;
