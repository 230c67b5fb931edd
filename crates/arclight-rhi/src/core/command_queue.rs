use std::rc::Rc;

use ash::vk;
use itertools::Itertools;

use crate::RhiResult;
use crate::core::device::RhiDevice;
use crate::core::synchronize::RhiFence;

#[derive(Clone, Debug)]
pub struct RhiQueueFamily {
    pub name: String,
    pub queue_family_index: u32,
    pub queue_flags: vk::QueueFlags,
    pub queue_count: u32,
}

/// # destroy
///
/// RhiQueue 在 RhiDevice 销毁时会被销毁
pub struct RhiQueue {
    pub(crate) handle: vk::Queue,
    pub(crate) queue_family: RhiQueueFamily,

    pub(crate) device: Rc<RhiDevice>,
}

impl RhiQueue {
    pub fn new(device: Rc<RhiDevice>, queue_family: RhiQueueFamily, debug_name: &str) -> Self {
        let handle = unsafe { device.get_device_queue(queue_family.queue_family_index, 0) };
        device.debug_utils.set_object_debug_name(handle, debug_name);

        Self {
            handle,
            queue_family,
            device,
        }
    }

    #[inline]
    pub fn handle(&self) -> vk::Queue {
        self.handle
    }

    #[inline]
    pub fn queue_family(&self) -> &RhiQueueFamily {
        &self.queue_family
    }

    /// 提交被驱动拒绝属于设备错误，交给调用方处理
    pub fn submit(&self, batches: Vec<RhiSubmitInfo>, fence: Option<&RhiFence>) -> RhiResult<()> {
        unsafe {
            // batches 的存在是有必要的，submit_infos 引用的是 batches 的内存
            let submit_infos = batches.iter().map(|b| *b.inner()).collect_vec();
            self.device.queue_submit2(self.handle, &submit_infos, fence.map_or(vk::Fence::null(), |f| f.handle()))
        }
    }

    /// 根据 specification，vkQueueWaitIdle 应该和 Fence 效率相同
    #[inline]
    pub fn wait_idle(&self) {
        unsafe { self.device.queue_wait_idle(self.handle).unwrap() }
    }
}

/// Rhi 关于 submitInfo 的封装，更易用
#[derive(Default)]
pub struct RhiSubmitInfo {
    inner: vk::SubmitInfo2<'static>,

    _command_buffers: Vec<vk::CommandBufferSubmitInfo<'static>>,
}

impl RhiSubmitInfo {
    pub fn new(commands: &[vk::CommandBuffer]) -> Self {
        let command_buffers =
            commands.iter().map(|cmd| vk::CommandBufferSubmitInfo::default().command_buffer(*cmd)).collect_vec();

        let inner = vk::SubmitInfo2 {
            // 暂时不使用该 flag
            flags: vk::SubmitFlags::empty(),

            command_buffer_info_count: command_buffers.len() as u32,
            p_command_buffer_infos: command_buffers.as_ptr(),
            ..Default::default()
        };

        Self {
            inner,
            _command_buffers: command_buffers,
        }
    }

    #[inline]
    pub fn inner(&self) -> &vk::SubmitInfo2 {
        &self.inner
    }
}
