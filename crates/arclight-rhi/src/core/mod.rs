//! 在 vk 的基础类型之上进行简单的封装

pub mod allocator;
pub mod buffer;
pub mod command_buffer;
pub mod command_pool;
pub mod command_queue;
pub mod debug_utils;
pub mod descriptor;
pub mod device;
pub mod framebuffer;
pub mod image;
pub mod instance;
pub mod physical_device;
pub mod pipeline;
pub mod push_constants;
pub mod shader;
pub mod submission_id;
pub mod synchronize;
pub mod texture;
