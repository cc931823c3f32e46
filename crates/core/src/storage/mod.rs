pub mod settings_store;
pub mod store;
