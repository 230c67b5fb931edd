use std::rc::Rc;

use ash::vk;
use vk_mem::Alloc;

use crate::core::allocator::RhiAllocator;
use crate::core::device::RhiDevice;
use crate::rhi::Rhi;

pub struct RhiImageCreateInfo {
    inner: vk::ImageCreateInfo<'static>,
}

impl RhiImageCreateInfo {
    #[inline]
    pub fn new_image_2d_info(extent: vk::Extent2D, format: vk::Format, usage: vk::ImageUsageFlags) -> Self {
        Self {
            inner: vk::ImageCreateInfo {
                image_type: vk::ImageType::TYPE_2D,
                format,
                extent: extent.into(),
                mip_levels: 1,
                array_layers: 1,
                samples: vk::SampleCountFlags::TYPE_1,
                tiling: vk::ImageTiling::OPTIMAL,
                usage,
                sharing_mode: vk::SharingMode::EXCLUSIVE,
                // spec 上面说，这里只能是 UNDEFINED 或者 PREINITIALIZED
                initial_layout: vk::ImageLayout::UNDEFINED,
                ..Default::default()
            },
        }
    }

    #[inline]
    pub fn creat_info(&self) -> &vk::ImageCreateInfo<'_> {
        &self.inner
    }

    /// getter
    #[inline]
    pub fn extent(&self) -> &vk::Extent3D {
        &self.inner.extent
    }

    /// getter
    #[inline]
    pub fn format(&self) -> vk::Format {
        self.inner.format
    }
}

pub struct RhiImageViewCreateInfo {
    inner: vk::ImageViewCreateInfo<'static>,
}

impl RhiImageViewCreateInfo {
    #[inline]
    pub fn new_image_view_2d_info(format: vk::Format, aspect: vk::ImageAspectFlags) -> Self {
        Self {
            inner: vk::ImageViewCreateInfo {
                format,
                view_type: vk::ImageViewType::TYPE_2D,
                subresource_range: vk::ImageSubresourceRange {
                    aspect_mask: aspect,
                    level_count: 1,
                    layer_count: 1,
                    ..Default::default()
                },
                ..Default::default()
            },
        }
    }

    #[inline]
    pub fn inner(&self) -> &vk::ImageViewCreateInfo<'_> {
        &self.inner
    }
}

pub struct RhiImage2D {
    handle: vk::Image,

    allocation: vk_mem::Allocation,

    _name: String,
    image_info: Rc<RhiImageCreateInfo>,

    allocator: Rc<RhiAllocator>,
}
impl Drop for RhiImage2D {
    fn drop(&mut self) {
        unsafe { self.allocator.destroy_image(self.handle, &mut self.allocation) }
    }
}
// getter
impl RhiImage2D {
    #[inline]
    pub fn width(&self) -> u32 {
        self.image_info.extent().width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.image_info.extent().height
    }

    #[inline]
    pub fn handle(&self) -> vk::Image {
        self.handle
    }

    #[inline]
    pub fn format(&self) -> vk::Format {
        self.image_info.format()
    }
}
impl RhiImage2D {
    pub fn new(
        rhi: &Rhi,
        image_info: Rc<RhiImageCreateInfo>,
        alloc_info: &vk_mem::AllocationCreateInfo,
        debug_name: &str,
    ) -> Self {
        let (image, alloc) = unsafe { rhi.allocator.create_image(image_info.creat_info(), alloc_info).unwrap() };
        rhi.device().debug_utils.set_object_debug_name(image, debug_name);

        Self {
            _name: debug_name.to_string(),

            handle: image,
            allocation: alloc,

            image_info,
            allocator: rhi.allocator.clone(),
        }
    }
}

pub struct RhiImage2DView {
    handle: vk::ImageView,

    _info: Rc<RhiImageViewCreateInfo>,
    _name: String,

    device: Rc<RhiDevice>,
}
impl Drop for RhiImage2DView {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_image_view(self.handle, None);
        }
    }
}
impl RhiImage2DView {
    pub fn new(rhi: &Rhi, image: vk::Image, mut info: RhiImageViewCreateInfo, name: impl AsRef<str>) -> Self {
        info.inner.image = image;
        let handle = unsafe { rhi.device().create_image_view(&info.inner, None).unwrap() };
        rhi.device().debug_utils.set_object_debug_name(handle, name.as_ref());

        Self {
            handle,
            _info: Rc::new(info),
            _name: name.as_ref().to_string(),
            device: rhi.device().clone(),
        }
    }

    /// getter
    #[inline]
    pub fn handle(&self) -> vk::ImageView {
        self.handle
    }
}
