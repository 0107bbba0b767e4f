pub mod repository;
mod statements_cache;
