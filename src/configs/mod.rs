pub mod audio;
pub mod base;
pub mod bot;
pub mod logging;
pub mod player;
pub mod server;

pub use audio::*;
pub use base::*;
pub use bot::*;
pub use logging::*;
pub use player::*;
pub use server::*;
