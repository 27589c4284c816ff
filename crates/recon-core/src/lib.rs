pub mod branch;
pub mod hash;
pub mod ids;
pub mod issue_match;
pub mod model;
pub mod path;
pub mod snapshot;
pub mod types;

pub use branch::*;
pub use hash::*;
pub use ids::*;
pub use issue_match::*;
pub use model::*;
pub use snapshot::*;
pub use types::*;
