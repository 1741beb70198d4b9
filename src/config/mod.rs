mod store;

pub use store::{JournalMode, StoreConfig};
