pub mod memory_store;
pub mod mongo_store;

pub use memory_store::InMemoryMessageStore;
pub use mongo_store::MongoMessageStore;
