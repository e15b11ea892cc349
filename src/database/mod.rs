// Database module
// SQLite chunk store: the durable source of truth the in-memory shards are rebuilt from

pub mod sqlite;

pub use sqlite::*;
