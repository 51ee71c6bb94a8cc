pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod fetch;
pub mod fs_util;
pub mod manifest;
pub mod output;
pub mod resolver;
pub mod source;
pub mod store;
pub mod window;
