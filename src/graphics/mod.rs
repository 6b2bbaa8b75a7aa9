pub mod backend;
pub mod command_allocator;
pub mod command_list;
pub mod command_queue;
pub mod device;
pub mod fence;
pub mod soft;
pub mod swapchain;
pub mod types;
pub mod upload_buffer;

mod utils;

pub use utils::{align, CONSTANT_BUFFER_ALIGNMENT};
