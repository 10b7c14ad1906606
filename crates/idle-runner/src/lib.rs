pub mod config;
pub mod scenario;
pub mod service;
pub mod util;

pub use config::*;
pub use service::*;
pub use util::*;
