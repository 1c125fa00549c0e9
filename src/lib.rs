pub mod config;
pub mod error;
pub mod features;
pub mod football_json;
pub mod history;
pub mod http_cache;
pub mod http_client;
pub mod logging;
pub mod matches;
pub mod meta;
pub mod sink;
pub mod standings;
pub mod transfermarkt;
