// Database access layer

mod pool;

pub use pool::DbPool;
