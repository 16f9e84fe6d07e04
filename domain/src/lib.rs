pub mod api;
pub mod conversation;
pub mod error;
pub mod library;
pub mod models;
pub mod selection;
pub mod storage;
pub mod upload_policy;
