pub mod favorite_flags;
pub mod form;
pub mod handlers;
pub mod repository;
pub mod search;
pub mod validation;
