//! Bearer-token authentication for users, company users and admins.

pub mod extractors;
pub mod password;
pub mod tokens;

pub use extractors::{AdminSession, CurrentCompanyUser, CurrentUser, MaybeUser};
