//! In-memory repositories

mod seed;
mod store;

pub use seed::{MemorySeed, SeedMember, SeedRoom, SeedServer, SeedUser};
pub use store::MemoryStore;
