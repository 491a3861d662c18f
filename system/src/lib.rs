pub extern crate bincode;
pub extern crate serde;
pub extern crate serde_json;

mod codec;
mod membership;
mod message;
mod stroke_log;
mod validation;

pub use codec::*;
pub use membership::*;
pub use message::*;
pub use stroke_log::*;
pub use validation::*;
