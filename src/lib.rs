pub mod audio;
pub mod bot;
pub mod command;
pub mod common;
pub mod configs;
pub mod media;
pub mod monitoring;
pub mod player;
pub mod protocol;
pub mod server;
pub mod sink;
pub mod transport;
