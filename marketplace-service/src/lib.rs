pub mod config;
pub mod dtos;
pub mod handlers;
pub mod ledger;
pub mod middleware;
pub mod models;
pub mod policy;
pub mod pricing;
pub mod reports;
pub mod services;
pub mod startup;
pub mod utils;
