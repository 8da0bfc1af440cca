pub mod bulk_export;
pub mod etl;

pub use crate::domain::model::{Table, TransformResult};
pub use crate::domain::ports::{Pipeline, Storage};
pub use crate::utils::error::Result;
