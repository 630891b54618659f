pub mod customer;
pub mod product;
pub mod user;
pub mod workflow;
