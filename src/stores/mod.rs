pub mod file_token_store;
pub mod memory_token_store;
