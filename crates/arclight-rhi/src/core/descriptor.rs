use std::rc::Rc;

use ash::vk;

use crate::core::buffer::RhiBuffer;
use crate::core::device::RhiDevice;
use crate::rhi::Rhi;

/// 描述符池创建信息
///
/// 用于配置描述符池的创建参数，包括：
/// - 标志位
/// - 最大描述符集数量
/// - 每种类型描述符的最大数量
pub struct RhiDescriptorPoolCreateInfo {
    inner: vk::DescriptorPoolCreateInfo<'static>,
    _pool_sizes: Vec<vk::DescriptorPoolSize>,
}

impl RhiDescriptorPoolCreateInfo {
    #[inline]
    pub fn new(flags: vk::DescriptorPoolCreateFlags, max_sets: u32, pool_sizes: Vec<vk::DescriptorPoolSize>) -> Self {
        let inner = vk::DescriptorPoolCreateInfo {
            flags,
            max_sets,
            pool_size_count: pool_sizes.len() as u32,
            p_pool_sizes: pool_sizes.as_ptr(),
            ..Default::default()
        };
        Self {
            inner,
            _pool_sizes: pool_sizes,
        }
    }
}

/// 描述符池
///
/// 一个描述符池可以分配多个描述符集
pub struct RhiDescriptorPool {
    handle: vk::DescriptorPool,
    _info: Rc<RhiDescriptorPoolCreateInfo>,

    device: Rc<RhiDevice>,
}
impl Drop for RhiDescriptorPool {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_descriptor_pool(self.handle, None);
        }
    }
}

impl RhiDescriptorPool {
    #[inline]
    pub fn new(rhi: &Rhi, ci: Rc<RhiDescriptorPoolCreateInfo>, name: &str) -> Self {
        let pool = unsafe { rhi.device().create_descriptor_pool(&ci.inner, None).unwrap() };
        rhi.device().debug_utils.set_object_debug_name(pool, name);

        Self {
            handle: pool,
            _info: ci,
            device: rhi.device().clone(),
        }
    }

    #[inline]
    pub fn handle(&self) -> vk::DescriptorPool {
        self.handle
    }
}

/// 描述符集布局
///
/// 定义了描述符集的结构，包括绑定的数量、每个绑定的类型以及着色器阶段
pub struct RhiDescriptorSetLayout {
    layout: vk::DescriptorSetLayout,

    _device: Rc<RhiDevice>,
}
impl Drop for RhiDescriptorSetLayout {
    fn drop(&mut self) {
        unsafe {
            self._device.destroy_descriptor_set_layout(self.layout, None);
        }
    }
}

impl RhiDescriptorSetLayout {
    pub fn new(
        rhi: &Rhi,
        flags: vk::DescriptorSetLayoutCreateFlags,
        bindings: &[vk::DescriptorSetLayoutBinding],
        debug_name: &str,
    ) -> Self {
        let create_info = vk::DescriptorSetLayoutCreateInfo::default().flags(flags).bindings(bindings);

        let layout = unsafe { rhi.device().create_descriptor_set_layout(&create_info, None).unwrap() };
        rhi.device().debug_utils.set_object_debug_name(layout, debug_name);

        Self {
            layout,
            _device: rhi.device().clone(),
        }
    }

    #[inline]
    pub fn handle(&self) -> vk::DescriptorSetLayout {
        self.layout
    }
}

/// 描述符集
///
/// # Destroy
///
/// 跟随 descriptor pool 一起销毁
pub struct RhiDescriptorSet {
    handle: vk::DescriptorSet,

    device: Rc<RhiDevice>,
}

impl RhiDescriptorSet {
    pub fn new(
        rhi: &Rhi,
        descriptor_pool: &RhiDescriptorPool,
        layout: &RhiDescriptorSetLayout,
        debug_name: &str,
    ) -> Self {
        let alloc_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(descriptor_pool.handle())
            .set_layouts(std::slice::from_ref(&layout.layout));
        let descriptor_set = unsafe { rhi.device().allocate_descriptor_sets(&alloc_info).unwrap()[0] };
        rhi.device().debug_utils.set_object_debug_name(descriptor_set, debug_name);

        Self {
            handle: descriptor_set,
            device: rhi.device().clone(),
        }
    }

    #[inline]
    pub fn handle(&self) -> vk::DescriptorSet {
        self.handle
    }

    /// 将 buffer 的整个范围写入到指定的 binding 上
    pub fn write_buffer(&self, binding: u32, descriptor_type: vk::DescriptorType, buffer: &RhiBuffer) {
        let buffer_info =
            vk::DescriptorBufferInfo::default().buffer(buffer.handle()).offset(0).range(buffer.size());
        let write = vk::WriteDescriptorSet::default()
            .dst_set(self.handle)
            .dst_binding(binding)
            .descriptor_type(descriptor_type)
            .buffer_info(std::slice::from_ref(&buffer_info));

        unsafe {
            self.device.update_descriptor_sets(std::slice::from_ref(&write), &[]);
        }
    }
}
