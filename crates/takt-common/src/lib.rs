pub mod error;
pub mod ids;
pub mod score;

pub use error::*;
pub use ids::*;
pub use score::*;
