pub mod error;
pub mod json_bridge;
pub mod profile;
pub mod schema;
pub mod store;

pub use error::{Result, StoreError};
pub use profile::{DATA_DIR_ENV, ProfileStore, default_base_dir, resolve_base_dir};
pub use store::Store;
