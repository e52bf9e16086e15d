pub mod gate;
pub mod memory;
pub mod sqlite;

pub use gate::SessionGate;
pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

#[cfg(test)]
mod tests;
