pub mod app;
pub mod config;
pub mod logging;
pub mod render;
pub mod source;
pub mod theme;
pub mod view;
