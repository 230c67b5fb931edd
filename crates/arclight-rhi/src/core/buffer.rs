use ash::vk;
use std::{ffi::c_void, rc::Rc};
use vk_mem::Alloc;

use crate::{
    core::{allocator::RhiAllocator, device::RhiDevice},
    rhi::Rhi,
};

pub struct RhiBufferCreateInfo {
    inner: vk::BufferCreateInfo<'static>,
}
impl RhiBufferCreateInfo {
    #[inline]
    pub fn new(size: vk::DeviceSize, usage: vk::BufferUsageFlags) -> Self {
        Self {
            inner: vk::BufferCreateInfo {
                size,
                usage,
                ..Default::default()
            },
        }
    }

    #[inline]
    pub fn info(&self) -> &vk::BufferCreateInfo {
        &self.inner
    }

    #[inline]
    pub fn size(&self) -> vk::DeviceSize {
        self.inner.size
    }
}

pub struct RhiBuffer {
    handle: vk::Buffer,
    allocation: vk_mem::Allocation,

    map_ptr: Option<*mut u8>,
    size: vk::DeviceSize,

    _debug_name: String,

    allocator: Rc<RhiAllocator>,
    _device: Rc<RhiDevice>,

    _buffer_info: Rc<RhiBufferCreateInfo>,
    _alloc_info: Rc<vk_mem::AllocationCreateInfo>,
}
impl Drop for RhiBuffer {
    fn drop(&mut self) {
        unsafe {
            self.allocator.destroy_buffer(self.handle, &mut self.allocation);
        }
    }
}
// constructor & getter
impl RhiBuffer {
    pub fn new(
        rhi: &Rhi,
        buffer_ci: Rc<RhiBufferCreateInfo>,
        alloc_ci: Rc<vk_mem::AllocationCreateInfo>,
        debug_name: impl AsRef<str>,
    ) -> Self {
        unsafe {
            let (buffer, allocation) = rhi.allocator.create_buffer(buffer_ci.info(), &alloc_ci).unwrap();

            rhi.device().debug_utils.set_object_debug_name(buffer, debug_name.as_ref());
            Self {
                handle: buffer,
                allocation,
                map_ptr: None,
                size: buffer_ci.size(),
                _debug_name: debug_name.as_ref().to_string(),
                allocator: rhi.allocator.clone(),
                _device: rhi.device().clone(),
                _buffer_info: buffer_ci,
                _alloc_info: alloc_ci,
            }
        }
    }

    #[inline]
    pub fn new_device_buffer(
        rhi: &Rhi,
        size: vk::DeviceSize,
        flags: vk::BufferUsageFlags,
        debug_name: impl AsRef<str>,
    ) -> Self {
        Self::new(
            rhi,
            Rc::new(RhiBufferCreateInfo::new(size, flags)),
            Rc::new(vk_mem::AllocationCreateInfo {
                usage: vk_mem::MemoryUsage::AutoPreferDevice,
                ..Default::default()
            }),
            debug_name,
        )
    }

    /// host 可见的 buffer，用于向 GPU 上传数据
    #[inline]
    pub fn new_stage_buffer(rhi: &Rhi, size: vk::DeviceSize, debug_name: impl AsRef<str>) -> Self {
        Self::new(
            rhi,
            Rc::new(RhiBufferCreateInfo::new(size, vk::BufferUsageFlags::TRANSFER_SRC)),
            Rc::new(vk_mem::AllocationCreateInfo {
                usage: vk_mem::MemoryUsage::Auto,
                flags: vk_mem::AllocationCreateFlags::HOST_ACCESS_RANDOM,
                ..Default::default()
            }),
            debug_name,
        )
    }

    /// host 可见的 buffer，用于从 GPU 回读数据
    #[inline]
    pub fn new_readback_buffer(rhi: &Rhi, size: vk::DeviceSize, debug_name: impl AsRef<str>) -> Self {
        Self::new(
            rhi,
            Rc::new(RhiBufferCreateInfo::new(size, vk::BufferUsageFlags::TRANSFER_DST)),
            Rc::new(vk_mem::AllocationCreateInfo {
                usage: vk_mem::MemoryUsage::Auto,
                flags: vk_mem::AllocationCreateFlags::HOST_ACCESS_RANDOM,
                ..Default::default()
            }),
            debug_name,
        )
    }

    /// host 可见的 storage buffer，compute shader 可以直接读写
    #[inline]
    pub fn new_storage_buffer(rhi: &Rhi, size: vk::DeviceSize, debug_name: impl AsRef<str>) -> Self {
        Self::new(
            rhi,
            Rc::new(RhiBufferCreateInfo::new(
                size,
                vk::BufferUsageFlags::STORAGE_BUFFER
                    | vk::BufferUsageFlags::TRANSFER_SRC
                    | vk::BufferUsageFlags::TRANSFER_DST,
            )),
            Rc::new(vk_mem::AllocationCreateInfo {
                usage: vk_mem::MemoryUsage::Auto,
                flags: vk_mem::AllocationCreateFlags::HOST_ACCESS_RANDOM,
                ..Default::default()
            }),
            debug_name,
        )
    }

    /// getter
    #[inline]
    pub fn handle(&self) -> vk::Buffer {
        self.handle
    }

    #[inline]
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }
}
impl RhiBuffer {
    #[inline]
    pub fn mapped_ptr(&self) -> *mut u8 {
        self.map_ptr.unwrap_or_else(|| {
            panic!("Buffer is not mapped, please call map() before using mapped_ptr()");
        })
    }

    #[inline]
    pub fn map(&mut self) {
        if self.map_ptr.is_some() {
            return;
        }
        unsafe {
            self.map_ptr = Some(self.allocator.map_memory(&mut self.allocation).unwrap());
        }
    }

    #[inline]
    pub fn flush(&mut self, offset: vk::DeviceSize, size: vk::DeviceSize) {
        self.allocator.flush_allocation(&self.allocation, offset, size).unwrap();
    }

    #[inline]
    pub fn unmap(&mut self) {
        if self.map_ptr.is_none() {
            return;
        }
        unsafe {
            self.allocator.unmap_memory(&mut self.allocation);
            self.map_ptr = None;
        }
    }

    /// 通过 mem map 的方式将 data 传入到 buffer 中
    ///
    /// 注：确保 buffer 内存的对齐方式和 T 保持一致
    pub fn transfer_data_by_mem_map<T>(&mut self, data: &[T])
    where
        T: Sized + Copy,
    {
        self.map();
        unsafe {
            // 这里的 size 是目标内存的最大 size
            // align 表示目标内存位置额外的内存对齐要求，这里使用 align_of 表示和 rust 中 T 保持一致
            let mut slice =
                ash::util::Align::new(self.map_ptr.unwrap() as *mut c_void, align_of::<T>() as u64, self.size);
            slice.copy_from_slice(data);
            self.allocator.flush_allocation(&self.allocation, 0, size_of_val(data) as vk::DeviceSize).unwrap();
        }
        self.unmap();
    }

    /// 通过 mem map 的方式从 buffer 中读出 count 个 T
    pub fn read_data_by_mem_map<T>(&mut self, count: usize) -> Vec<T>
    where
        T: bytemuck::Pod,
    {
        let byte_size = count * size_of::<T>();
        assert!(byte_size as vk::DeviceSize <= self.size, "read out of buffer range");

        self.map();
        self.allocator.invalidate_allocation(&self.allocation, 0, byte_size as vk::DeviceSize).unwrap();
        let data = unsafe {
            let bytes = std::slice::from_raw_parts(self.map_ptr.unwrap(), byte_size);
            bytemuck::pod_collect_to_vec(bytes)
        };
        self.unmap();
        data
    }
}
