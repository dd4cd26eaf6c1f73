//! Domain models for the clinic core.

mod address;
mod draft;
mod patient;
mod payload;
mod phone;
mod profile;
mod search;

pub use address::*;
pub use draft::*;
pub use patient::*;
pub use payload::*;
pub use phone::*;
pub use profile::*;
pub use search::*;
