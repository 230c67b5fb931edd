use ash::vk;
use itertools::Itertools;
use std::{ffi::CStr, ops::Deref, rc::Rc};

use crate::core::command_queue::RhiQueueFamily;
use crate::core::debug_utils::RhiDebugUtils;
use crate::core::{instance::RhiInstance, physical_device::RhiPhysicalDevice};

pub struct RhiDevice {
    pub handle: ash::Device,

    pub pdevice: Rc<RhiPhysicalDevice>,

    pub debug_utils: Rc<RhiDebugUtils>,
}

impl Deref for RhiDevice {
    type Target = ash::Device;

    fn deref(&self) -> &Self::Target {
        &self.handle
    }
}

impl RhiDevice {
    pub fn new(
        vk_pf: &ash::Entry,
        instance: &RhiInstance,
        pdevice: Rc<RhiPhysicalDevice>,
        queue_create_info: &[vk::DeviceQueueCreateInfo],
    ) -> Self {
        // device 所需的所有 extension
        let device_exts = Self::basic_device_exts().iter().map(|e| e.as_ptr()).collect_vec();
        let mut exts_str = String::new();
        for ext in &device_exts {
            exts_str.push_str(&format!("\n\t{:?}", unsafe { CStr::from_ptr(*ext) }));
        }
        log::info!("device exts: {}", exts_str);

        // device 所需的所有 features
        let mut all_features = vk::PhysicalDeviceFeatures2::default().features(Self::physical_device_basic_features());
        let mut physical_device_ext_features = Self::physical_device_extra_features();
        unsafe {
            physical_device_ext_features.iter_mut().for_each(|f| {
                let ptr = <*mut dyn vk::ExtendsPhysicalDeviceFeatures2>::cast::<vk::BaseOutStructure>(f.as_mut());
                (*ptr).p_next = all_features.p_next as _;
                all_features.p_next = ptr as _;
            });
        }

        let device_create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(queue_create_info)
            .enabled_extension_names(&device_exts)
            .push_next(&mut all_features);

        let device = unsafe { instance.handle.create_device(pdevice.handle, &device_create_info, None).unwrap() };

        let debug_utils = Rc::new(RhiDebugUtils::new(vk_pf, &instance.handle, &device));

        Self {
            handle: device,
            pdevice: pdevice.clone(),

            debug_utils,
        }
    }

    /// 必要的 physical device core features
    fn physical_device_basic_features() -> vk::PhysicalDeviceFeatures {
        vk::PhysicalDeviceFeatures::default()
    }

    /// 必要的 physical device extension features
    fn physical_device_extra_features() -> Vec<Box<dyn vk::ExtendsPhysicalDeviceFeatures2>> {
        vec![Box::new(vk::PhysicalDeviceSynchronization2Features::default().synchronization2(true))]
    }

    /// 必要的 device extensions
    ///
    /// sync2 在 vk1.3 已经并入 core，不需要额外的 extension
    fn basic_device_exts() -> Vec<&'static CStr> {
        vec![]
    }

    /// device 需要晚于 allocator 等对象销毁
    pub fn destroy(&self) {
        unsafe {
            self.handle.destroy_device(None);
        }
    }
}

impl RhiDevice {
    #[inline]
    pub fn graphics_queue_family(&self) -> RhiQueueFamily {
        self.pdevice.graphics_queue_family.clone()
    }

    #[inline]
    pub fn compute_queue_family(&self) -> RhiQueueFamily {
        self.pdevice.compute_queue_family.clone()
    }

    #[inline]
    pub fn transfer_queue_family(&self) -> RhiQueueFamily {
        self.pdevice.transfer_queue_family.clone()
    }

    /// 超过这个尺寸的常量数据就应该使用 uniform buffer
    #[inline]
    pub fn max_push_constants_size(&self) -> u32 {
        self.pdevice.max_push_constants_size()
    }

    #[inline]
    pub fn create_render_pass(&self, render_pass_ci: &vk::RenderPassCreateInfo, debug_name: &str) -> vk::RenderPass {
        let render_pass = unsafe { self.handle.create_render_pass(render_pass_ci, None).unwrap() };
        self.debug_utils.set_object_debug_name(render_pass, debug_name);
        render_pass
    }

    #[inline]
    pub fn create_frame_buffer(
        &self,
        frame_buffer_ci: &vk::FramebufferCreateInfo,
        debug_name: &str,
    ) -> vk::Framebuffer {
        let frame_buffer = unsafe { self.handle.create_framebuffer(frame_buffer_ci, None).unwrap() };
        self.debug_utils.set_object_debug_name(frame_buffer, debug_name);
        frame_buffer
    }
}
