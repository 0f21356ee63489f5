//! Public company pages.

pub mod handlers;
