pub mod admins;
pub mod assistants;
pub mod auth;
pub mod catalog;
pub mod health;
pub mod shop_owners;
pub mod shops;
