/*!
Modules making up a single check of the Sentry table
*/

pub mod config;
pub mod detection_engine;
pub mod error;
pub mod fetcher;
pub mod output_plugins;
pub mod sound;
pub mod state_manager;
pub mod tracker;
