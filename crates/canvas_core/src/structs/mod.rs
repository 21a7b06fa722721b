pub mod edge;
pub mod message;
pub mod node;
