pub mod handlers;
pub mod interests;
pub mod service;
