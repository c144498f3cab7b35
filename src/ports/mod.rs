//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the usecases layer requires from
//! the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `ExchangeGateway`: discrete command calls against the exchange
//! - `Repository`: persistence for ticks, orders, and trades

pub mod exchange;
pub mod repository;
