pub mod auth;

pub use auth::AuthorizedUser;
