pub mod error;
pub mod types;

pub use error::{Result, StoreError};
pub use types::{
    DeploymentMode, DocumentScope, Period, PeriodGranularity, ScopeShape, StorageFormat,
    natural_key_cmp,
};
