use std::rc::Rc;

use ash::vk;
use itertools::Itertools;

use crate::RhiResult;
use crate::basic::color::LabelColor;
use crate::core::buffer::RhiBuffer;
use crate::core::command_pool::RhiCommandPool;
use crate::core::command_queue::{RhiQueue, RhiSubmitInfo};
use crate::core::descriptor::RhiDescriptorSet;
use crate::core::device::RhiDevice;
use crate::core::framebuffer::RhiFrameBuffer;
use crate::core::pipeline::{RhiPipeline, RhiPipelineLayout};
use crate::core::push_constants::RhiPushConstants;
use crate::core::submission_id::RhiSubmissionId;
use crate::core::synchronize::{RhiFence, RhiImageBarrier};
use crate::core::texture::RhiTexture2D;
use crate::rhi::Rhi;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmdState {
    /// 尚未 init()，不持有任何 vk 对象
    Uninitialized,
    /// 可以开始新一轮录制
    Ready,
    /// begin_recording() 和 end_recording() 之间
    Recording,
    /// 录制已经关闭，等待 submit()
    Executable,
}

/// 命令录制的状态记账，独立于 vk 对象，方便单独测试状态迁移
struct CmdLifecycle {
    state: CmdState,
    active_framebuffer: Option<vk::Framebuffer>,
}

impl CmdLifecycle {
    fn new() -> Self {
        Self {
            state: CmdState::Uninitialized,
            active_framebuffer: None,
        }
    }

    fn init(&mut self) {
        assert_eq!(self.state, CmdState::Uninitialized, "init() can only be called once for a command buffer");
        self.state = CmdState::Ready;
    }

    fn check_begin_recording(&self) {
        assert_eq!(
            self.state,
            CmdState::Ready,
            "begin_recording() requires the Ready state, current state is {:?}",
            self.state
        );
    }

    fn begin_recording(&mut self) {
        self.check_begin_recording();
        self.state = CmdState::Recording;
    }

    fn check_end_recording(&self) {
        assert_eq!(self.state, CmdState::Recording, "end_recording() without begin_recording()");
        assert!(
            self.active_framebuffer.is_none(),
            "end_recording() with an open render pass, call end_render_pass() first"
        );
    }

    fn end_recording(&mut self) {
        self.check_end_recording();
        self.state = CmdState::Executable;
    }

    fn begin_render_pass(&mut self, framebuffer: vk::Framebuffer) {
        self.require_recording("begin_render_pass()");
        assert!(self.active_framebuffer.is_none(), "nested begin_render_pass() without end_render_pass()");
        self.active_framebuffer = Some(framebuffer);
    }

    fn end_render_pass(&mut self, framebuffer: vk::Framebuffer) {
        self.require_recording("end_render_pass()");
        match self.active_framebuffer {
            None => panic!("end_render_pass() without a matching begin_render_pass()"),
            Some(active) => assert_eq!(
                active, framebuffer,
                "end_render_pass() called with a different framebuffer than begin_render_pass()"
            ),
        }
        self.active_framebuffer = None;
    }

    fn require_recording(&self, op: &str) {
        assert_eq!(self.state, CmdState::Recording, "{} is only valid while recording", op);
    }

    fn require_inside_render_pass(&self, op: &str) {
        assert!(self.active_framebuffer.is_some(), "{} requires an open render pass", op);
    }

    fn require_outside_render_pass(&self, op: &str) {
        assert!(self.active_framebuffer.is_none(), "{} is not allowed inside a render pass", op);
    }

    fn require_executable(&self) {
        assert_eq!(
            self.state,
            CmdState::Executable,
            "submit() requires end_recording() first, current state is {:?}",
            self.state
        );
    }

    fn complete_submit(&mut self) {
        debug_assert_eq!(self.state, CmdState::Executable);
        self.state = CmdState::Ready;
    }
}

/// init() 之后才持有的部分
struct CmdBound {
    handle: vk::CommandBuffer,
    device: Rc<RhiDevice>,
    queue: Rc<RhiQueue>,

    /// 每次 submit 都复用这一个 fence
    fence: RhiFence,

    debug_name: String,
}

/// 录制并提交 GPU 命令的核心状态机
///
/// 不可 Clone：native handle 的分配和释放由外部的 command pool 负责，
/// 这里只管理它的录制内容和 in-flight 状态，意外的复制会让同一个 handle 被多处录制
pub struct RhiCommandBuffer {
    bound: Option<CmdBound>,
    lifecycle: CmdLifecycle,
    submission_id: RhiSubmissionId,
}

impl Default for RhiCommandBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// basic 命令
impl RhiCommandBuffer {
    pub fn new() -> Self {
        Self {
            bound: None,
            lifecycle: CmdLifecycle::new(),
            submission_id: RhiSubmissionId::default(),
        }
    }

    /// 绑定 device、queue 以及外部分配好的 native handle
    ///
    /// 重复调用属于使用错误，会直接 panic
    pub fn init(&mut self, device: Rc<RhiDevice>, queue: Rc<RhiQueue>, handle: vk::CommandBuffer, debug_name: &str) {
        self.lifecycle.init();

        let fence = RhiFence::new(device.clone(), false, &format!("{}-fence", debug_name));
        self.bound = Some(CmdBound {
            handle,
            device,
            queue,
            fence,
            debug_name: debug_name.to_string(),
        });
    }

    fn bound(&self) -> &CmdBound {
        self.bound.as_ref().expect("command buffer is not initialized, call init() first")
    }

    /// getter
    #[inline]
    pub fn handle(&self) -> vk::CommandBuffer {
        self.bound().handle
    }

    /// 最近一次完成的 submit 的标识，任何状态下都可以读取
    #[inline]
    pub fn submission_id(&self) -> RhiSubmissionId {
        self.submission_id
    }

    /// 开始录制 command，上一个周期录制的内容会被清空
    ///
    /// 自动设置 debug label
    pub fn begin_recording(&mut self) -> RhiResult<()> {
        self.lifecycle.check_begin_recording();

        let bound = self.bound();
        unsafe {
            bound.device.reset_command_buffer(bound.handle, vk::CommandBufferResetFlags::empty())?;
            bound.device.begin_command_buffer(
                bound.handle,
                &vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT),
            )?;
        }
        self.begin_label(&bound.debug_name, LabelColor::COLOR_CMD);
        self.lifecycle.begin_recording();
        Ok(())
    }

    /// 结束录制 command
    ///
    /// 结束 debug label
    pub fn end_recording(&mut self) -> RhiResult<()> {
        self.lifecycle.check_end_recording();

        self.end_label();
        let bound = self.bound();
        unsafe {
            bound.device.end_command_buffer(bound.handle)?;
        }
        self.lifecycle.end_recording();
        Ok(())
    }

    /// 将录制好的命令交给 queue，阻塞等待设备侧执行完成
    ///
    /// 返回时 fence 已经 reset，submission id 前进一格，可以立即开始下一轮录制；
    /// 相邻两次 submit 的设备执行不会重叠
    pub fn submit(&mut self) -> RhiResult<()> {
        self.lifecycle.require_executable();

        let bound = self.bound();
        let submit_info = RhiSubmitInfo::new(std::slice::from_ref(&bound.handle));
        bound.queue.submit(vec![submit_info], Some(&bound.fence))?;
        bound.fence.wait()?;
        bound.fence.reset()?;

        self.submission_id.advance();
        self.lifecycle.complete_submit();
        Ok(())
    }

    /// 立即执行某个 command，并同步等待执行结果
    pub fn one_time_exec<F, R>(
        rhi: &Rhi,
        command_pool: &RhiCommandPool,
        queue: Rc<RhiQueue>,
        func: F,
        name: &str,
    ) -> RhiResult<R>
    where
        F: FnOnce(&mut RhiCommandBuffer) -> R,
    {
        let handle = command_pool.allocate_command_buffer(&format!("one-time-{}", name));
        let mut command_buffer = RhiCommandBuffer::new();
        command_buffer.init(rhi.device().clone(), queue, handle, name);

        command_buffer.begin_recording()?;
        let result = func(&mut command_buffer);
        command_buffer.end_recording()?;
        command_buffer.submit()?;

        command_pool.free_command_buffer(handle);
        Ok(result)
    }
}

// 绑定与 dispatch 命令
impl RhiCommandBuffer {
    /// - command type: state
    /// - 支持的 queue: graphics, compute
    #[inline]
    pub fn bind_pipeline(&self, bind_point: vk::PipelineBindPoint, pipeline: &RhiPipeline) {
        self.lifecycle.require_recording("bind_pipeline()");
        let bound = self.bound();
        unsafe {
            bound.device.cmd_bind_pipeline(bound.handle, bind_point, pipeline.handle());
        }
    }

    /// - command type: state
    /// - 支持的 queue: graphics, compute
    #[inline]
    pub fn bind_descriptor_set(
        &self,
        bind_point: vk::PipelineBindPoint,
        pipeline_layout: &RhiPipelineLayout,
        descriptor_set: &RhiDescriptorSet,
    ) {
        self.lifecycle.require_recording("bind_descriptor_set()");
        let bound = self.bound();
        unsafe {
            bound.device.cmd_bind_descriptor_sets(
                bound.handle,
                bind_point,
                pipeline_layout.handle(),
                0,
                std::slice::from_ref(&descriptor_set.handle()),
                &[],
            );
        }
    }

    /// 要求 push constant 数据的存储方式必须是 push constant 本体，
    /// uniform buffer 回退方式需要调用方走 descriptor set
    #[inline]
    pub fn push_constants(&self, pipeline_layout: &RhiPipelineLayout, push_constants: &RhiPushConstants) {
        self.lifecycle.require_recording("push_constants()");
        push_constants.require_push_storage();

        let bound = self.bound();
        unsafe {
            bound.device.cmd_push_constants(
                bound.handle,
                pipeline_layout.handle(),
                push_constants.stage_flags(),
                0,
                push_constants.bytes(),
            );
        }
    }

    /// - command type: action
    /// - 支持的 queue: compute
    #[inline]
    pub fn dispatch(&self, group_count_x: u32, group_count_y: u32, group_count_z: u32) {
        self.lifecycle.require_recording("dispatch()");
        let bound = self.bound();
        unsafe {
            bound.device.cmd_dispatch(bound.handle, group_count_x, group_count_y, group_count_z);
        }
    }
}

// render pass 命令
impl RhiCommandBuffer {
    /// attachment 需要事先转换到 GENERAL layout
    pub fn begin_render_pass(&mut self, framebuffer: &RhiFrameBuffer) {
        self.lifecycle.begin_render_pass(framebuffer.framebuffer());

        self.begin_label("render-pass", LabelColor::COLOR_PASS);
        let bound = self.bound();
        unsafe {
            bound.device.cmd_begin_render_pass(
                bound.handle,
                &framebuffer.render_pass_begin_info(),
                vk::SubpassContents::INLINE,
            );
        }
    }

    /// framebuffer 必须和 begin_render_pass() 传入的是同一个
    pub fn end_render_pass(&mut self, framebuffer: &RhiFrameBuffer) {
        self.lifecycle.end_render_pass(framebuffer.framebuffer());

        let bound = self.bound();
        unsafe {
            bound.device.cmd_end_render_pass(bound.handle);
        }
        self.end_label();
    }

    /// 清除当前 render pass 中若干 attachment 的若干矩形区域
    ///
    /// 只能在 render pass 内调用
    #[inline]
    pub fn clear_attachments(&self, attachments: &[vk::ClearAttachment], rects: &[vk::ClearRect]) {
        self.lifecycle.require_recording("clear_attachments()");
        self.lifecycle.require_inside_render_pass("clear_attachments()");

        let bound = self.bound();
        unsafe {
            bound.device.cmd_clear_attachments(bound.handle, attachments, rects);
        }
    }
}

// transfer 类型的命令
impl RhiCommandBuffer {
    /// - command type: action
    /// - 支持的 queue：transfer，graphics，compute
    #[inline]
    pub fn copy_buffer_to_texture(
        &self,
        src: &RhiBuffer,
        dst: &RhiTexture2D,
        dst_layout: vk::ImageLayout,
        regions: &[vk::BufferImageCopy2],
    ) {
        self.lifecycle.require_recording("copy_buffer_to_texture()");

        let copy_info = vk::CopyBufferToImageInfo2::default()
            .src_buffer(src.handle())
            .dst_image(dst.image())
            .dst_image_layout(dst_layout)
            .regions(regions);

        let bound = self.bound();
        unsafe {
            bound.device.cmd_copy_buffer_to_image2(bound.handle, &copy_info);
        }
    }

    /// - command type: action
    /// - 支持的 queue：transfer，graphics，compute
    #[inline]
    pub fn copy_texture_to_buffer(
        &self,
        src: &RhiTexture2D,
        src_layout: vk::ImageLayout,
        dst: &RhiBuffer,
        regions: &[vk::BufferImageCopy2],
    ) {
        self.lifecycle.require_recording("copy_texture_to_buffer()");

        let copy_info = vk::CopyImageToBufferInfo2::default()
            .src_image(src.image())
            .src_image_layout(src_layout)
            .dst_buffer(dst.handle())
            .regions(regions);

        let bound = self.bound();
        unsafe {
            bound.device.cmd_copy_image_to_buffer2(bound.handle, &copy_info);
        }
    }

    /// 将 color image 的若干 subresource range 清为指定颜色
    ///
    /// 只能在 render pass 之外调用
    #[inline]
    pub fn clear_color_image(
        &self,
        texture: &RhiTexture2D,
        layout: vk::ImageLayout,
        clear_color: vk::ClearColorValue,
        ranges: &[vk::ImageSubresourceRange],
    ) {
        self.lifecycle.require_recording("clear_color_image()");
        self.lifecycle.require_outside_render_pass("clear_color_image()");

        let bound = self.bound();
        unsafe {
            bound.device.cmd_clear_color_image(bound.handle, texture.image(), layout, &clear_color, ranges);
        }
    }

    /// 将一个 32 位 word 重复填满整个 buffer
    #[inline]
    pub fn fill_buffer(&self, buffer: &RhiBuffer, data: u32) {
        self.lifecycle.require_recording("fill_buffer()");
        let bound = self.bound();
        unsafe {
            bound.device.cmd_fill_buffer(bound.handle, buffer.handle(), 0, vk::WHOLE_SIZE, data);
        }
    }
}

// 同步命令
impl RhiCommandBuffer {
    /// 粗粒度的全局 barrier：等待 src stage 全部完成，dst stage 才能开始
    ///
    /// - command type: synchronize
    /// - 支持的 queue: graphics, compute, transfer
    #[inline]
    pub fn pipeline_barrier(&self, src_stage_mask: vk::PipelineStageFlags2, dst_stage_mask: vk::PipelineStageFlags2) {
        self.lifecycle.require_recording("pipeline_barrier()");

        let barrier = vk::MemoryBarrier2::default().src_stage_mask(src_stage_mask).dst_stage_mask(dst_stage_mask);
        let dependency_info = vk::DependencyInfo::default().memory_barriers(std::slice::from_ref(&barrier));

        let bound = self.bound();
        unsafe {
            bound.device.cmd_pipeline_barrier2(bound.handle, &dependency_info);
        }
    }

    /// 精确的 image barrier，image layout 发生变化时必须使用这种形式
    ///
    /// - command type: synchronize
    /// - 支持的 queue: graphics, compute, transfer
    #[inline]
    pub fn image_memory_barrier(&self, dependency_flags: vk::DependencyFlags, barriers: &[RhiImageBarrier]) {
        self.lifecycle.require_recording("image_memory_barrier()");

        let barriers = barriers.iter().map(|b| *b.inner()).collect_vec();
        let dependency_info =
            vk::DependencyInfo::default().image_memory_barriers(&barriers).dependency_flags(dependency_flags);

        let bound = self.bound();
        unsafe {
            bound.device.cmd_pipeline_barrier2(bound.handle, &dependency_info);
        }
    }
}

// debug 相关的指令
impl RhiCommandBuffer {
    /// - command type: state, action
    /// - 支持的 queue: graphics, compute
    #[inline]
    pub fn begin_label(&self, label_name: &str, label_color: glam::Vec4) {
        let bound = self.bound();
        bound.device.debug_utils.cmd_begin_debug_label(bound.handle, label_name, label_color);
    }

    /// - command type: state, action
    /// - 支持的 queue: graphics, compute
    #[inline]
    pub fn end_label(&self) {
        let bound = self.bound();
        bound.device.debug_utils.cmd_end_debug_label(bound.handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    fn recording_lifecycle() -> CmdLifecycle {
        let mut lifecycle = CmdLifecycle::new();
        lifecycle.init();
        lifecycle.begin_recording();
        lifecycle
    }

    #[test]
    fn test_full_cycle_reaches_ready_again() {
        let mut lifecycle = CmdLifecycle::new();
        lifecycle.init();
        assert_eq!(lifecycle.state, CmdState::Ready);

        lifecycle.begin_recording();
        lifecycle.require_recording("dispatch()");
        lifecycle.end_recording();
        lifecycle.require_executable();
        lifecycle.complete_submit();
        assert_eq!(lifecycle.state, CmdState::Ready);

        // submit 之后可以立即开始下一轮
        lifecycle.begin_recording();
        assert_eq!(lifecycle.state, CmdState::Recording);
    }

    #[test]
    fn test_balanced_render_pass() {
        let fb = vk::Framebuffer::from_raw(1);
        let mut lifecycle = recording_lifecycle();

        lifecycle.begin_render_pass(fb);
        lifecycle.require_inside_render_pass("clear_attachments()");
        lifecycle.end_render_pass(fb);
        lifecycle.require_outside_render_pass("clear_color_image()");
        lifecycle.end_recording();
    }

    #[test]
    #[should_panic(expected = "init() can only be called once")]
    fn test_double_init() {
        let mut lifecycle = CmdLifecycle::new();
        lifecycle.init();
        lifecycle.init();
    }

    #[test]
    #[should_panic(expected = "requires the Ready state")]
    fn test_begin_recording_without_init() {
        let mut lifecycle = CmdLifecycle::new();
        lifecycle.begin_recording();
    }

    #[test]
    #[should_panic(expected = "requires the Ready state")]
    fn test_nested_begin_recording() {
        let mut lifecycle = recording_lifecycle();
        lifecycle.begin_recording();
    }

    #[test]
    #[should_panic(expected = "end_recording() without begin_recording()")]
    fn test_end_recording_without_begin() {
        let mut lifecycle = CmdLifecycle::new();
        lifecycle.init();
        lifecycle.end_recording();
    }

    #[test]
    #[should_panic(expected = "is only valid while recording")]
    fn test_recording_op_outside_recording() {
        let mut lifecycle = CmdLifecycle::new();
        lifecycle.init();
        lifecycle.require_recording("dispatch()");
    }

    #[test]
    #[should_panic(expected = "is only valid while recording")]
    fn test_recording_op_after_end_recording() {
        let mut lifecycle = recording_lifecycle();
        lifecycle.end_recording();
        lifecycle.require_recording("fill_buffer()");
    }

    #[test]
    #[should_panic(expected = "nested begin_render_pass()")]
    fn test_nested_render_pass() {
        let mut lifecycle = recording_lifecycle();
        lifecycle.begin_render_pass(vk::Framebuffer::from_raw(1));
        lifecycle.begin_render_pass(vk::Framebuffer::from_raw(2));
    }

    #[test]
    #[should_panic(expected = "without a matching begin_render_pass()")]
    fn test_end_render_pass_without_begin() {
        let mut lifecycle = recording_lifecycle();
        lifecycle.end_render_pass(vk::Framebuffer::from_raw(1));
    }

    #[test]
    #[should_panic(expected = "different framebuffer")]
    fn test_end_render_pass_with_wrong_framebuffer() {
        let mut lifecycle = recording_lifecycle();
        lifecycle.begin_render_pass(vk::Framebuffer::from_raw(1));
        lifecycle.end_render_pass(vk::Framebuffer::from_raw(2));
    }

    #[test]
    #[should_panic(expected = "with an open render pass")]
    fn test_end_recording_with_open_render_pass() {
        let mut lifecycle = recording_lifecycle();
        lifecycle.begin_render_pass(vk::Framebuffer::from_raw(1));
        lifecycle.end_recording();
    }

    #[test]
    #[should_panic(expected = "requires an open render pass")]
    fn test_clear_attachments_requires_render_pass() {
        let lifecycle = recording_lifecycle();
        lifecycle.require_inside_render_pass("clear_attachments()");
    }

    #[test]
    #[should_panic(expected = "not allowed inside a render pass")]
    fn test_clear_color_image_rejected_inside_render_pass() {
        let mut lifecycle = recording_lifecycle();
        lifecycle.begin_render_pass(vk::Framebuffer::from_raw(1));
        lifecycle.require_outside_render_pass("clear_color_image()");
    }

    #[test]
    #[should_panic(expected = "submit() requires end_recording()")]
    fn test_submit_while_recording() {
        let lifecycle = recording_lifecycle();
        lifecycle.require_executable();
    }

    #[test]
    #[should_panic(expected = "submit() requires end_recording()")]
    fn test_submit_twice_without_new_recording() {
        let mut lifecycle = recording_lifecycle();
        lifecycle.end_recording();
        lifecycle.complete_submit();
        lifecycle.require_executable();
    }

    #[test]
    fn test_submission_id_readable_in_any_state() {
        let command_buffer = RhiCommandBuffer::new();
        assert_eq!(command_buffer.submission_id().value(), 0);
    }

    #[test]
    #[should_panic(expected = "not initialized")]
    fn test_handle_requires_init() {
        let command_buffer = RhiCommandBuffer::new();
        let _ = command_buffer.handle();
    }
}
