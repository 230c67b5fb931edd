use std::rc::Rc;

use ash::vk;
use itertools::Itertools;

use crate::core::device::RhiDevice;
use crate::core::image::RhiImage2DView;
use crate::rhi::Rhi;

/// render pass 和 framebuffer 的组合
///
/// attachment 使用 LOAD/STORE，layout 固定为 GENERAL，
/// 进入 render pass 之前需要调用方自行将 image 转换到 GENERAL layout
pub struct RhiFrameBuffer {
    render_pass: vk::RenderPass,
    framebuffer: vk::Framebuffer,
    extent: vk::Extent2D,

    device: Rc<RhiDevice>,
    _debug_name: String,
}

impl Drop for RhiFrameBuffer {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_framebuffer(self.framebuffer, None);
            self.device.destroy_render_pass(self.render_pass, None);
        }
    }
}

impl RhiFrameBuffer {
    pub fn new(
        rhi: &Rhi,
        attachments: &[&RhiImage2DView],
        format: vk::Format,
        extent: vk::Extent2D,
        debug_name: &str,
    ) -> Self {
        assert!(!attachments.is_empty(), "framebuffer requires at least one attachment");

        let attachment_descs = attachments
            .iter()
            .map(|_| vk::AttachmentDescription {
                format,
                samples: vk::SampleCountFlags::TYPE_1,
                load_op: vk::AttachmentLoadOp::LOAD,
                store_op: vk::AttachmentStoreOp::STORE,
                stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
                stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
                initial_layout: vk::ImageLayout::GENERAL,
                final_layout: vk::ImageLayout::GENERAL,
                ..Default::default()
            })
            .collect_vec();

        let attachment_refs = (0..attachments.len() as u32)
            .map(|idx| vk::AttachmentReference {
                attachment: idx,
                layout: vk::ImageLayout::GENERAL,
            })
            .collect_vec();

        let subpass = vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&attachment_refs);

        let render_pass_ci = vk::RenderPassCreateInfo::default()
            .attachments(&attachment_descs)
            .subpasses(std::slice::from_ref(&subpass));
        let render_pass = rhi.device().create_render_pass(&render_pass_ci, debug_name);

        let views = attachments.iter().map(|view| view.handle()).collect_vec();
        let framebuffer_ci = vk::FramebufferCreateInfo::default()
            .render_pass(render_pass)
            .attachments(&views)
            .width(extent.width)
            .height(extent.height)
            .layers(1);
        let framebuffer = rhi.device().create_frame_buffer(&framebuffer_ci, debug_name);

        Self {
            render_pass,
            framebuffer,
            extent,
            device: rhi.device().clone(),
            _debug_name: debug_name.to_string(),
        }
    }

    #[inline]
    pub fn render_pass(&self) -> vk::RenderPass {
        self.render_pass
    }

    #[inline]
    pub fn framebuffer(&self) -> vk::Framebuffer {
        self.framebuffer
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// render area 覆盖整个 framebuffer
    #[inline]
    pub fn render_pass_begin_info(&self) -> vk::RenderPassBeginInfo<'static> {
        vk::RenderPassBeginInfo::default()
            .render_pass(self.render_pass)
            .framebuffer(self.framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D::default(),
                extent: self.extent,
            })
    }
}
