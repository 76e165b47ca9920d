pub mod customer;
pub mod project;
pub mod quote;
pub mod service;
pub mod user;
