pub mod contribution;
pub mod event;
pub mod event_manager;
pub mod expense;
pub mod invitation;
pub mod job_registry_item;
