pub mod catalog;
pub mod ids;
pub mod model;
pub mod outcomes;
pub mod reconcile;
pub mod types;

pub use catalog::*;
pub use ids::*;
pub use model::*;
pub use outcomes::*;
pub use reconcile::*;
pub use types::*;
