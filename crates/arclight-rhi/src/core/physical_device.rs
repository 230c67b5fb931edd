use std::ffi::CStr;

use ash::vk;
use itertools::Itertools;

use crate::core::command_queue::RhiQueueFamily;

/// 表示一张物理显卡
pub struct RhiPhysicalDevice {
    pub handle: vk::PhysicalDevice,

    /// 当前 gpu 支持的 features
    pub features: vk::PhysicalDeviceFeatures,

    /// 当前 gpu 的基础属性
    pub basic_props: vk::PhysicalDeviceProperties,

    pub memory_properties: vk::PhysicalDeviceMemoryProperties,

    pub queue_family_properties: Vec<vk::QueueFamilyProperties>,

    pub graphics_queue_family: RhiQueueFamily,
    pub compute_queue_family: RhiQueueFamily,
    pub transfer_queue_family: RhiQueueFamily,
}

impl RhiPhysicalDevice {
    /// 创建一个新的物理显卡实例
    ///
    /// 优先选择独立显卡，如果没有则选择第一个可用的显卡
    pub fn new_descrete_gpu(instance: &ash::Instance) -> Self {
        unsafe {
            instance
                .enumerate_physical_devices()
                .unwrap()
                .iter()
                .map(|pdevice| RhiPhysicalDevice::new(*pdevice, instance))
                // 优先使用独立显卡
                .find_or_first(RhiPhysicalDevice::is_descrete_gpu)
                .unwrap()
        }
    }

    pub fn new(pdevice: vk::PhysicalDevice, instance: &ash::Instance) -> Self {
        unsafe {
            let basic_props = instance.get_physical_device_properties(pdevice);
            let physical_device_name = CStr::from_ptr(basic_props.device_name.as_ptr());
            log::info!("found gpu: {:?}", physical_device_name);

            let queue_family_properties = instance.get_physical_device_queue_family_properties(pdevice);

            let graphics_queue_family =
                Self::pick_queue_family(&queue_family_properties, vk::QueueFlags::GRAPHICS, "graphics");
            let compute_queue_family =
                Self::pick_queue_family(&queue_family_properties, vk::QueueFlags::COMPUTE, "compute");
            let transfer_queue_family =
                Self::pick_queue_family(&queue_family_properties, vk::QueueFlags::TRANSFER, "transfer");

            Self {
                memory_properties: instance.get_physical_device_memory_properties(pdevice),
                features: instance.get_physical_device_features(pdevice),
                handle: pdevice,
                basic_props,
                queue_family_properties,
                graphics_queue_family,
                compute_queue_family,
                transfer_queue_family,
            }
        }
    }

    /// 当前 gpu 是否是独立显卡
    #[inline]
    pub fn is_descrete_gpu(&self) -> bool {
        self.basic_props.device_type == vk::PhysicalDeviceType::DISCRETE_GPU
    }

    #[inline]
    pub fn max_push_constants_size(&self) -> u32 {
        self.basic_props.limits.max_push_constants_size
    }

    /// 找到包含指定 flags 的 queue family，优先选择专用的 family
    ///
    /// 专用指除了 GRAPHICS 之外不含多余能力的 family，比如独显上的 transfer-only family；
    /// 找不到专用的就退回第一个包含该 flags 的 family
    fn pick_queue_family(
        queue_family_properties: &[vk::QueueFamilyProperties],
        queue_flags: vk::QueueFlags,
        name: &str,
    ) -> RhiQueueFamily {
        let make_family = |(index, prop): (usize, &vk::QueueFamilyProperties)| RhiQueueFamily {
            name: name.to_string(),
            queue_family_index: index as u32,
            queue_flags: prop.queue_flags,
            queue_count: prop.queue_count,
        };

        let dedicated = queue_family_properties
            .iter()
            .enumerate()
            .find(|(_, prop)| {
                prop.queue_flags.contains(queue_flags) && !prop.queue_flags.contains(vk::QueueFlags::GRAPHICS)
            })
            .filter(|_| queue_flags != vk::QueueFlags::GRAPHICS);

        let fallback = queue_family_properties
            .iter()
            .enumerate()
            .find(|(_, prop)| prop.queue_flags.contains(queue_flags))
            .or_else(|| {
                // graphics 和 compute 隐含 transfer 能力，部分驱动不标 TRANSFER 位
                if queue_flags.contains(vk::QueueFlags::TRANSFER) {
                    queue_family_properties.iter().enumerate().find(|(_, prop)| {
                        prop.queue_flags.intersects(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE)
                    })
                } else {
                    None
                }
            });

        dedicated
            .or(fallback)
            .map(make_family)
            .unwrap_or_else(|| panic!("no queue family supports {:?}", queue_flags))
    }
}
