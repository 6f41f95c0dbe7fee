//! Model to entity mappers
//!
//! `From<Model> for Entity` where every row maps cleanly, `TryFrom` where a
//! row can violate an entity invariant.

mod message;
mod room;
mod user;
