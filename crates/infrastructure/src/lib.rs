//! Storage adapters for the application ports.

#![forbid(unsafe_code)]

mod activity_entry;
mod in_memory_store;
mod postgres_activity_log_repository;
mod postgres_profile_repository;
mod postgres_project_repository;
mod postgres_qa_item_repository;
mod postgres_review_repository;
mod store_error;

pub use in_memory_store::InMemoryQaStore;
pub use postgres_activity_log_repository::PostgresActivityLogRepository;
pub use postgres_profile_repository::PostgresProfileRepository;
pub use postgres_project_repository::PostgresProjectRepository;
pub use postgres_qa_item_repository::PostgresQaItemRepository;
pub use postgres_review_repository::PostgresReviewRepository;
