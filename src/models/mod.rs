pub mod principal;
pub mod shop;
