pub mod backfill;
pub mod entry;
pub mod history;
pub mod rows;
pub mod settings;
pub mod view;
