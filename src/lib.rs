// TodoStore - Todo-list state with filtering, derived stats and key-value persistence

pub mod clock;
pub mod codec;
pub mod config;
pub mod filter;
pub mod kv;
pub mod models;
pub mod sqlite;
pub mod store;

// Re-export main types for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Backend, Config};
pub use filter::{FilterUpdate, TodoFilter};
pub use kv::{FileKv, KvStore, MemoryKv};
pub use models::{NewTodo, Todo, TodoPriority, TodoStats, TodoStatus, TodoUpdate, parse_timestamp};
pub use sqlite::SqliteKv;
pub use store::{STORAGE_KEY, TodoStore};
