mod info;
mod metadata;
mod request;

pub use info::*;
pub use metadata::*;
pub use request::*;
