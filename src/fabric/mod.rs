//! Cross-thread fabric: lock-free SPSC queues and bounded object pools.

mod pool;
mod spsc;

pub use pool::{Handle, ObjectPool};
pub use spsc::{Consumer, Producer, spsc_channel};
