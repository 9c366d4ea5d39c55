pub mod model;
pub mod store;

pub use model::{PersistedSettings, SETTINGS_KEY};
pub use store::{JsonFileStore, KeyValueStore, MemoryStore, load_settings, save_settings};
