//! Common structs for insurance risk records shared across crates.

mod customer;
mod event;
mod label;
mod model;
mod score;
mod text;

pub use customer::*;
pub use event::*;
pub use label::*;
pub use model::*;
pub use score::*;
pub use text::*;
