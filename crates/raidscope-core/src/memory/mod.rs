pub mod collections;
pub mod layout;
mod reader;
pub mod scatter;

#[cfg(test)]
pub mod mock;

pub use collections::{MongoId, RemoteArray, RemoteDict, RemoteHashSet, SANITY_CEILING, pool};
pub use reader::{RemoteMemory, RemoteMemoryExt, ScatterRequest, is_valid_ptr};
pub use scatter::{ScatterBatch, ScatterRounds};

#[cfg(test)]
pub use mock::{MockMemory, MockMemoryBuilder};
