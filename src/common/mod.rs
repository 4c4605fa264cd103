pub mod banner;
pub mod colours;
pub mod errors;
pub mod format;
pub mod logger;
pub mod types;

pub use errors::*;
pub use logger::*;
pub use types::*;
