use std::rc::Rc;

use ash::vk;

use crate::core::command_queue::RhiQueueFamily;
use crate::core::device::RhiDevice;

/// command pool 是和 queue family 绑定的，而不是和 queue 绑定的
pub struct RhiCommandPool {
    handle: vk::CommandPool,
    _queue_family: RhiQueueFamily,

    device: Rc<RhiDevice>,
    _debug_name: String,
}
impl Drop for RhiCommandPool {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_command_pool(self.handle, None);
        }
    }
}
impl RhiCommandPool {
    #[inline]
    pub fn new(
        device: Rc<RhiDevice>,
        queue_family: RhiQueueFamily,
        flags: vk::CommandPoolCreateFlags,
        debug_name: &str,
    ) -> Self {
        let pool = unsafe {
            device
                .create_command_pool(
                    &vk::CommandPoolCreateInfo::default()
                        .queue_family_index(queue_family.queue_family_index)
                        .flags(flags),
                    None,
                )
                .unwrap()
        };
        device.debug_utils.set_object_debug_name(pool, debug_name);

        Self {
            handle: pool,
            _queue_family: queue_family,
            device: device.clone(),
            _debug_name: debug_name.to_string(),
        }
    }

    /// getter
    #[inline]
    pub fn handle(&self) -> vk::CommandPool {
        self.handle
    }

    /// 分配一个 primary command buffer，释放需要调用 free_command_buffer()
    pub fn allocate_command_buffer(&self, debug_name: &str) -> vk::CommandBuffer {
        let allocate_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.handle)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        let command_buffer = unsafe { self.device.allocate_command_buffers(&allocate_info).unwrap()[0] };
        self.device.debug_utils.set_object_debug_name(command_buffer, debug_name);
        command_buffer
    }

    #[inline]
    pub fn free_command_buffer(&self, command_buffer: vk::CommandBuffer) {
        unsafe {
            self.device.free_command_buffers(self.handle, std::slice::from_ref(&command_buffer));
        }
    }

    /// 这个调用并不会释放资源，而是将 pool 内的 command buffer 设置到初始状态
    ///
    /// reset 之后，pool 内的 command buffer 又可以重新录制命令
    pub fn reset_all_buffers(&self) {
        unsafe {
            self.device.reset_command_pool(self.handle, vk::CommandPoolResetFlags::RELEASE_RESOURCES).unwrap();
        }
    }
}
