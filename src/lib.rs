#![allow(clippy::doc_markdown)]
#![doc = include_str!("../README.md")]

pub mod aggregate;
pub mod cache;
pub mod cli;
pub mod fetcher;
pub mod parser;
pub mod prelude;
pub mod price;
pub mod quantity;
pub mod retry;
pub mod source;
pub mod store;
pub mod summary;
pub mod tables;
pub mod tariff;
pub mod tracker;
