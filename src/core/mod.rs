pub mod image;
pub mod rate_limit;
pub mod relay;

pub use crate::domain::model::{Entry, Record, Revision};
pub use crate::domain::ports::RecordStore;
pub use crate::utils::error::Result;
