pub mod chunk_repository;
