use std::ffi::CStr;
use std::rc::Rc;

use ash::vk;

use crate::core::device::RhiDevice;
use crate::core::shader::RhiShaderModule;
use crate::rhi::Rhi;

/// pipeline layout 可以被多个 pipeline 共享，因此独立于 pipeline 管理
pub struct RhiPipelineLayout {
    handle: vk::PipelineLayout,

    device: Rc<RhiDevice>,
}
impl Drop for RhiPipelineLayout {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_pipeline_layout(self.handle, None);
        }
    }
}
impl RhiPipelineLayout {
    pub fn new(
        rhi: &Rhi,
        descriptor_set_layouts: &[vk::DescriptorSetLayout],
        push_constant_ranges: &[vk::PushConstantRange],
        debug_name: &str,
    ) -> Self {
        let pipeline_layout_create_info = vk::PipelineLayoutCreateInfo::default()
            .set_layouts(descriptor_set_layouts)
            .push_constant_ranges(push_constant_ranges);
        let handle = unsafe { rhi.device().create_pipeline_layout(&pipeline_layout_create_info, None).unwrap() };
        rhi.device().debug_utils.set_object_debug_name(handle, debug_name);

        Self {
            handle,
            device: rhi.device().clone(),
        }
    }

    #[inline]
    pub fn handle(&self) -> vk::PipelineLayout {
        self.handle
    }
}

pub struct RhiPipeline {
    pipeline: vk::Pipeline,

    device: Rc<RhiDevice>,
}

impl Drop for RhiPipeline {
    fn drop(&mut self) {
        unsafe {
            log::info!("Destroying RhiPipeline");
            self.device.destroy_pipeline(self.pipeline, None);
        }
    }
}

impl RhiPipeline {
    pub fn new_compute(
        rhi: &Rhi,
        pipeline_layout: &RhiPipelineLayout,
        shader_module: &RhiShaderModule,
        entry_point: &CStr,
        debug_name: &str,
    ) -> Self {
        let stage_info = vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::COMPUTE)
            .module(shader_module.handle)
            .name(entry_point);

        let pipeline_create_info =
            vk::ComputePipelineCreateInfo::default().stage(stage_info).layout(pipeline_layout.handle());

        let pipeline = unsafe {
            rhi.device()
                .create_compute_pipelines(vk::PipelineCache::null(), std::slice::from_ref(&pipeline_create_info), None)
                .unwrap()[0]
        };
        rhi.device().debug_utils.set_object_debug_name(pipeline, debug_name);

        Self {
            pipeline,
            device: rhi.device().clone(),
        }
    }

    #[inline]
    pub fn handle(&self) -> vk::Pipeline {
        self.pipeline
    }
}
