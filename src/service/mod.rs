pub mod chat_service;
pub mod index_service;
