pub mod app_config;
pub mod json_repo;
pub mod memory_repo;

pub use app_config::Config;
pub use json_repo::JsonFileRepository;
pub use memory_repo::InMemoryRepository;
