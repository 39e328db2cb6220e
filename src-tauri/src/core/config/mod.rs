pub mod store;

pub use store::{Config, ConfigStore, DEFAULT_CONTENT_VERSION, DEFAULT_RAM_GB};
