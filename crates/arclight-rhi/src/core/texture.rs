use std::rc::Rc;

use ash::vk;

use crate::core::image::{RhiImage2D, RhiImage2DView, RhiImageCreateInfo, RhiImageViewCreateInfo};
use crate::rhi::Rhi;

/// image 和对应 view 的组合，image 的生命周期由 texture 管理
pub struct RhiTexture2D {
    image: RhiImage2D,
    image_view: RhiImage2DView,
}

impl RhiTexture2D {
    pub fn new(
        rhi: &Rhi,
        extent: vk::Extent2D,
        format: vk::Format,
        usage: vk::ImageUsageFlags,
        name: &str,
    ) -> Self {
        let image = RhiImage2D::new(
            rhi,
            Rc::new(RhiImageCreateInfo::new_image_2d_info(extent, format, usage)),
            &vk_mem::AllocationCreateInfo {
                usage: vk_mem::MemoryUsage::AutoPreferDevice,
                ..Default::default()
            },
            name,
        );

        let image_view = RhiImage2DView::new(
            rhi,
            image.handle(),
            RhiImageViewCreateInfo::new_image_view_2d_info(format, vk::ImageAspectFlags::COLOR),
            format!("{name}-view"),
        );

        Self { image, image_view }
    }

    #[inline]
    pub fn image_view(&self) -> &RhiImage2DView {
        &self.image_view
    }

    #[inline]
    pub fn image(&self) -> vk::Image {
        self.image.handle()
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    #[inline]
    pub fn format(&self) -> vk::Format {
        self.image.format()
    }

    /// 整个 image 的 color subresource
    #[inline]
    pub fn whole_subresource_range(&self) -> vk::ImageSubresourceRange {
        vk::ImageSubresourceRange {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        }
    }

    #[inline]
    pub fn subresource_layers(&self, mip_level: u32) -> vk::ImageSubresourceLayers {
        vk::ImageSubresourceLayers {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            mip_level,
            base_array_layer: 0,
            layer_count: 1,
        }
    }

    /// 覆盖 mip0 整个范围的 copy region，用于 buffer 和 texture 之间的完整拷贝
    #[inline]
    pub fn full_copy_region(&self) -> vk::BufferImageCopy2<'static> {
        vk::BufferImageCopy2::default()
            .buffer_offset(0)
            .buffer_row_length(0)
            .buffer_image_height(0)
            .image_offset(vk::Offset3D::default())
            .image_extent(vk::Extent3D {
                width: self.width(),
                height: self.height(),
                depth: 1,
            })
            .image_subresource(self.subresource_layers(0))
    }
}
