//! Request and response bodies. Everything on the wire is camelCase.

pub mod auth;
pub mod customers;
pub mod messages;
pub mod orders;
pub mod products;
pub mod reports;
pub mod transactions;
