pub mod conversation_service;
pub mod formatter;
pub mod history_service;
pub mod library_service;
pub mod reveal;
pub mod view;
