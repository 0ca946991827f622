mod error;
pub mod filter;
mod index;
mod memory;
pub mod path;
mod pipeline;
pub mod sort;
mod store;
pub mod text;
pub mod value;

pub use error::StoreError;
pub use index::{ID_INDEX, IndexModel, IndexOptions};
pub use memory::MemoryStore;
pub use pipeline::Projection;
pub use store::{DocumentStore, FindOptions};
