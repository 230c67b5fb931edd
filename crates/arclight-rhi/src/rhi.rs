use std::ffi::CStr;
use std::rc::Rc;

use ash::vk;

use crate::core::allocator::RhiAllocator;
use crate::core::command_pool::RhiCommandPool;
use crate::core::command_queue::RhiQueue;
use crate::core::device::RhiDevice;
use crate::core::instance::RhiInstance;
use crate::core::physical_device::RhiPhysicalDevice;
use crate::vulkan_context::VulkanContext;

/// 对外的总入口，持有 vk 环境、内存分配器以及每个 queue family 的 command pool
pub struct Rhi {
    pub allocator: Rc<RhiAllocator>,

    pub graphics_command_pool: Rc<RhiCommandPool>,
    pub compute_command_pool: Rc<RhiCommandPool>,
    pub transfer_command_pool: Rc<RhiCommandPool>,

    // pool 和 allocator 的 Drop 会调用 vk 函数，vk_ctx 持有的 Entry 必须最后 drop
    vk_ctx: VulkanContext,
}

/// 创建与销毁
impl Rhi {
    const ENGINE_NAME: &'static str = "Arclight";

    pub fn new(app_name: String, instance_extra_exts: Vec<&'static CStr>) -> Self {
        let vk_ctx = VulkanContext::new(app_name, Self::ENGINE_NAME.to_string(), instance_extra_exts);

        let allocator = Rc::new(RhiAllocator::new(
            vk_ctx.instance.clone(),
            vk_ctx.physical_device.clone(),
            vk_ctx.device.clone(),
        ));

        // command buffer 会被反复 reset 重录，pool 需要 RESET_COMMAND_BUFFER
        let graphics_command_pool = Rc::new(RhiCommandPool::new(
            vk_ctx.device.clone(),
            vk_ctx.physical_device.graphics_queue_family.clone(),
            vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
            "rhi-graphics",
        ));
        let compute_command_pool = Rc::new(RhiCommandPool::new(
            vk_ctx.device.clone(),
            vk_ctx.physical_device.compute_queue_family.clone(),
            vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
            "rhi-compute",
        ));
        let transfer_command_pool = Rc::new(RhiCommandPool::new(
            vk_ctx.device.clone(),
            vk_ctx.physical_device.transfer_queue_family.clone(),
            vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
            "rhi-transfer",
        ));

        Self {
            allocator,
            graphics_command_pool,
            compute_command_pool,
            transfer_command_pool,
            vk_ctx,
        }
    }

    /// 调用之前需要放掉外部持有的 pool 和 allocator 的引用
    pub fn destroy(self) {
        let Self {
            allocator,
            graphics_command_pool,
            compute_command_pool,
            transfer_command_pool,
            vk_ctx,
        } = self;

        // pool 和 allocator 需要先于 device 销毁
        drop(graphics_command_pool);
        drop(compute_command_pool);
        drop(transfer_command_pool);
        drop(allocator);

        vk_ctx.destroy();
    }
}

/// getter
impl Rhi {
    #[inline]
    pub fn instance(&self) -> &RhiInstance {
        &self.vk_ctx.instance
    }

    #[inline]
    pub fn device(&self) -> &Rc<RhiDevice> {
        &self.vk_ctx.device
    }

    #[inline]
    pub fn physical_device(&self) -> &RhiPhysicalDevice {
        &self.vk_ctx.physical_device
    }

    #[inline]
    pub fn graphics_queue(&self) -> &Rc<RhiQueue> {
        &self.vk_ctx.graphics_queue
    }

    #[inline]
    pub fn compute_queue(&self) -> &Rc<RhiQueue> {
        &self.vk_ctx.compute_queue
    }

    #[inline]
    pub fn transfer_queue(&self) -> &Rc<RhiQueue> {
        &self.vk_ctx.transfer_queue
    }

    /// 超过这个大小的 push constant 数据需要退化为 uniform buffer
    #[inline]
    pub fn max_push_constants_size(&self) -> u32 {
        self.vk_ctx.device.max_push_constants_size()
    }
}
