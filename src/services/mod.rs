pub mod auth;
pub mod client;
pub mod editor;
pub mod export;
pub mod fetch;
pub mod merge;
