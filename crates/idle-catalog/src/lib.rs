pub mod catalog;
pub mod defaults;

pub use catalog::*;
pub use defaults::*;
