pub mod pool;

pub use pool::{mask_key, KeyPool, KeyStatus, PoolStatus};
