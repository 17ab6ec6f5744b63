pub mod cart;
pub mod catalog;
pub mod money;
pub mod order;
pub mod ports;
pub mod sequence;
