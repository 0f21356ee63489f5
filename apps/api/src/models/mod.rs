pub mod admin;
pub mod application;
pub mod company;
pub mod enums;
pub mod favorite;
pub mod interest;
pub mod job_posting;
pub mod resume;
pub mod user;
