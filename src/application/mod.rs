//! Application layer: the store's services over a [`KvStore`](crate::domain::ports::KvStore).
//!
//! Every operation that reads and then writes runs inside a
//! [`UnitOfWork`](unit_of_work::UnitOfWork) and is retried on
//! `ConcurrencyConflict` according to its [`RetryConfig`](retry::RetryConfig).

pub mod cart;
pub mod catalog;
pub mod id_generator;
pub mod orders;
pub mod retry;
pub mod storefront;
pub mod unit_of_work;
