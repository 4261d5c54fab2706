#![forbid(unsafe_code)]

pub mod http;
pub mod records;
pub mod repository;

pub use http::{HttpBackend, HttpConfig};
pub use repository::{
    ContentStore, ExerciseStore, InMemoryRepository, LivesStore, Storage, StorageError, TopicStore,
};
