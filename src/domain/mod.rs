//! Domain model: catalog records, cart and favorites, order snapshots.

pub mod cart;
pub mod catalog;
pub mod order;
pub mod value_objects;
