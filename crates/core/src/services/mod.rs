pub mod animation;
pub mod backfill;
pub mod charts;
pub mod format;
pub mod gate;
pub mod history_service;
pub mod notifications;
pub mod reconciler;
pub mod summary;
pub mod what_if;
