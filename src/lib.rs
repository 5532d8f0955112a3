pub mod app;
pub mod audio;
pub mod command;
pub mod config;
pub mod error;
pub mod i18n;
pub mod library;
pub mod logging;
pub mod model;
pub mod sequencer;
pub mod streaming;
pub mod ui;
pub mod visualiser;
