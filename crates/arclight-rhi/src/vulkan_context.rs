use std::ffi::CStr;
use std::rc::Rc;

use ash::vk;
use itertools::Itertools;

use crate::core::command_queue::RhiQueue;
use crate::core::device::RhiDevice;
use crate::core::instance::RhiInstance;
use crate::core::physical_device::RhiPhysicalDevice;

pub struct VulkanContext {
    pub(crate) instance: Rc<RhiInstance>,
    pub(crate) physical_device: Rc<RhiPhysicalDevice>,
    pub(crate) device: Rc<RhiDevice>,

    pub(crate) graphics_queue: Rc<RhiQueue>,
    pub(crate) compute_queue: Rc<RhiQueue>,
    pub(crate) transfer_queue: Rc<RhiQueue>,

    /// vk 基础函数的接口
    ///
    /// 在 drop 之后，会卸载 dll，放在最后保证最后 drop
    pub(crate) _vk_pf: ash::Entry,
}

/// 创建与销毁
impl VulkanContext {
    pub fn new(app_name: String, engine_name: String, instance_extra_exts: Vec<&'static CStr>) -> Self {
        let vk_pf = unsafe { ash::Entry::load() }.expect("Failed to load vulkan entry");
        let instance = Rc::new(RhiInstance::new(&vk_pf, app_name, engine_name, instance_extra_exts));
        let physical_device = Rc::new(RhiPhysicalDevice::new_descrete_gpu(instance.ash_instance()));

        // 同一个 queue family 在 create info 中只能出现一次，
        // 集显或者软渲染的 graphics/compute/transfer 可能都是同一个 family
        let queue_priorities = [1.0_f32];
        let queue_create_infos = [
            physical_device.graphics_queue_family.queue_family_index,
            physical_device.compute_queue_family.queue_family_index,
            physical_device.transfer_queue_family.queue_family_index,
        ]
        .iter()
        .unique()
        .map(|family_index| {
            vk::DeviceQueueCreateInfo::default()
                .queue_family_index(*family_index)
                .queue_priorities(&queue_priorities)
        })
        .collect_vec();

        let device = Rc::new(RhiDevice::new(&vk_pf, &instance, physical_device.clone(), &queue_create_infos));

        let graphics_queue =
            Rc::new(RhiQueue::new(device.clone(), physical_device.graphics_queue_family.clone(), "graphics-queue"));
        let compute_queue =
            Rc::new(RhiQueue::new(device.clone(), physical_device.compute_queue_family.clone(), "compute-queue"));
        let transfer_queue =
            Rc::new(RhiQueue::new(device.clone(), physical_device.transfer_queue_family.clone(), "transfer-queue"));

        log::info!("graphics queue's queue family:\n{:#?}", graphics_queue.queue_family());
        log::info!("compute queue's queue family:\n{:#?}", compute_queue.queue_family());
        log::info!("transfer queue's queue family:\n{:#?}", transfer_queue.queue_family());

        // 在 debug_utils 之前创建的 vk::Handle
        {
            let debug_utils = &device.debug_utils;
            debug_utils.set_object_debug_name(instance.vk_instance(), "RhiInstance");
            debug_utils.set_object_debug_name(physical_device.handle, "RhiPhysicalDevice");
            debug_utils.set_object_debug_name(device.handle.handle(), "RhiDevice");
        }

        Self {
            _vk_pf: vk_pf,
            instance,
            physical_device,
            device,
            graphics_queue,
            compute_queue,
            transfer_queue,
        }
    }

    /// messenger 是 instance 级别的对象，注意销毁顺序
    pub fn destroy(self) {
        self.device.debug_utils.destroy();
        self.device.destroy();
        self.instance.destroy();
    }
}
