pub mod adjustment;
pub mod customer;
pub mod product;
pub mod purchase;
pub mod user;
