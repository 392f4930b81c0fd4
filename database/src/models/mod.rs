// Row types for the Postgres tables

pub mod user;

pub use user::UserRow;
