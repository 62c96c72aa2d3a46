pub mod effective;
pub mod error;
pub mod merge;
pub mod types;

pub use effective::EffectiveFilter;
pub use error::FilterError;
pub use merge::merge;
pub use types::*;
