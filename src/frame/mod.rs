mod dirty;
mod frame_resource;
mod ring;

pub use dirty::*;
pub use frame_resource::*;
pub use ring::*;
