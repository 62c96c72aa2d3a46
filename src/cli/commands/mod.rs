pub mod cache;
pub mod pages;
pub mod token;
