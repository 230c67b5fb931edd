//! 集成测试：命令录制与提交的完整闭环
//!
//! 需要真实的 vulkan 驱动（GPU 或 lavapipe 等软件实现），覆盖录制、提交、
//! submission id 推进、compute dispatch、render pass 内外的 clear 以及
//! buffer 和 texture 之间的数据搬运。环境里没有驱动时测试自动跳过。
//!
//! Run with: cargo test --test record_submit -- --nocapture

use std::rc::Rc;
use std::sync::{Mutex, Once};

use arclight_rhi::core::buffer::RhiBuffer;
use arclight_rhi::core::command_buffer::RhiCommandBuffer;
use arclight_rhi::core::command_pool::RhiCommandPool;
use arclight_rhi::core::command_queue::RhiQueue;
use arclight_rhi::core::descriptor::{
    RhiDescriptorPool, RhiDescriptorPoolCreateInfo, RhiDescriptorSet, RhiDescriptorSetLayout,
};
use arclight_rhi::core::framebuffer::RhiFrameBuffer;
use arclight_rhi::core::pipeline::{RhiPipeline, RhiPipelineLayout};
use arclight_rhi::core::push_constants::RhiPushConstants;
use arclight_rhi::core::shader::RhiShaderModule;
use arclight_rhi::core::synchronize::{RhiBarrierMask, RhiImageBarrier};
use arclight_rhi::core::texture::RhiTexture2D;
use arclight_rhi::rhi::Rhi;
use ash::vk;

static INIT_LOG: Once = Once::new();
static DRIVER_PROBE_LOCK: Mutex<()> = Mutex::new(());

/// 尝试建立 vulkan 环境，驱动缺失（无 GPU 的 CI 等）时返回 None，测试跳过
///
/// Rhi::new 在找不到驱动时会直接 panic，这里借 catch_unwind 把它变成一次探测。
/// panic hook 是进程级的，探测期间加锁避免并行测试互相覆盖
fn try_create_rhi(app_name: &str) -> Option<Rhi> {
    INIT_LOG.call_once(arclight_crate_tools::init_log::init_log);

    let guard = DRIVER_PROBE_LOCK.lock().unwrap();
    let hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(|_| {}));
    let name = app_name.to_string();
    let result = std::panic::catch_unwind(move || Rhi::new(name, vec![]));
    std::panic::set_hook(hook);
    drop(guard);

    match result {
        Ok(rhi) => Some(rhi),
        Err(_) => {
            eprintln!("no vulkan driver available, skipping {app_name}");
            None
        }
    }
}

/// 从指定 pool 分配一个 command buffer 并完成 init
fn init_command_buffer(rhi: &Rhi, pool: &RhiCommandPool, queue: &Rc<RhiQueue>, name: &str) -> RhiCommandBuffer {
    let handle = pool.allocate_command_buffer(name);
    let mut command_buffer = RhiCommandBuffer::new();
    command_buffer.init(rhi.device().clone(), queue.clone(), handle, name);
    command_buffer
}

/// 把 WGSL compute shader 编译为 SPIR-V words
fn compile_wgsl_compute(wgsl_source: &str, entry_point: &str) -> Vec<u32> {
    let module = naga::front::wgsl::parse_str(wgsl_source).expect("failed to parse WGSL");

    let info = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::PUSH_CONSTANT,
    )
    .validate(&module)
    .expect("WGSL validation failed");

    let options = naga::back::spv::Options {
        lang_version: (1, 0),
        ..Default::default()
    };
    let pipeline_options = naga::back::spv::PipelineOptions {
        shader_stage: naga::ShaderStage::Compute,
        entry_point: entry_point.to_string(),
    };

    let mut writer = naga::back::spv::Writer::new(&options).expect("failed to create SPIR-V writer");
    let mut words = Vec::new();
    writer
        .write(&module, &info, Some(&pipeline_options), &None, &mut words)
        .expect("failed to generate SPIR-V");
    words
}

/// 同一个 command buffer 反复 录制 -> 提交，submission id 每轮 +1
#[test]
fn test_submit_advances_submission_id() {
    let Some(rhi) = try_create_rhi("test-submission-id") else {
        return;
    };
    {
        let mut cmd = init_command_buffer(&rhi, &rhi.graphics_command_pool, rhi.graphics_queue(), "id-advance");
        assert_eq!(cmd.submission_id().value(), 0);

        for round in 0..16u64 {
            cmd.begin_recording().unwrap();
            cmd.pipeline_barrier(vk::PipelineStageFlags2::ALL_COMMANDS, vk::PipelineStageFlags2::ALL_COMMANDS);
            cmd.end_recording().unwrap();
            cmd.submit().unwrap();

            // submit 返回即执行完成，立刻可以开始下一轮录制
            assert_eq!(cmd.submission_id().value(), round + 1);
        }

        rhi.graphics_command_pool.free_command_buffer(cmd.handle());
    }
    rhi.destroy();
}

const SCALE_BIAS_WGSL: &str = r#"
struct Params {
    scale: u32,
    bias: u32,
}

var<push_constant> params: Params;

@group(0) @binding(0) var<storage, read_write> data: array<u32>;

@compute @workgroup_size(8, 8, 1)
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {
    let idx = gid.y * 64u + gid.x;
    data[idx] = data[idx] * params.scale + params.bias;
}
"#;

/// compute dispatch 全流程：storage buffer + descriptor set + push constant
#[test]
fn test_compute_dispatch_scale_bias() {
    let Some(rhi) = try_create_rhi("test-compute-dispatch") else {
        return;
    };
    {
        const ELEMENT_COUNT: usize = 64 * 64;

        let mut buffer = RhiBuffer::new_storage_buffer(
            &rhi,
            (ELEMENT_COUNT * size_of::<u32>()) as vk::DeviceSize,
            "scale-bias-data",
        );
        let seed: Vec<u32> = (0..ELEMENT_COUNT as u32).collect();
        buffer.transfer_data_by_mem_map(&seed);

        let binding = vk::DescriptorSetLayoutBinding::default()
            .binding(0)
            .descriptor_type(vk::DescriptorType::STORAGE_BUFFER)
            .descriptor_count(1)
            .stage_flags(vk::ShaderStageFlags::COMPUTE);
        let set_layout = RhiDescriptorSetLayout::new(
            &rhi,
            vk::DescriptorSetLayoutCreateFlags::empty(),
            std::slice::from_ref(&binding),
            "scale-bias-set-layout",
        );
        let descriptor_pool = RhiDescriptorPool::new(
            &rhi,
            Rc::new(RhiDescriptorPoolCreateInfo::new(
                vk::DescriptorPoolCreateFlags::empty(),
                1,
                vec![vk::DescriptorPoolSize {
                    ty: vk::DescriptorType::STORAGE_BUFFER,
                    descriptor_count: 1,
                }],
            )),
            "scale-bias-pool",
        );
        let descriptor_set = RhiDescriptorSet::new(&rhi, &descriptor_pool, &set_layout, "scale-bias-set");
        descriptor_set.write_buffer(0, vk::DescriptorType::STORAGE_BUFFER, &buffer);

        let mut push_constants =
            RhiPushConstants::new(rhi.max_push_constants_size(), vk::ShaderStageFlags::COMPUTE, 2 * size_of::<u32>());
        push_constants.write_pod(0, &[3u32, 7u32]);

        let pipeline_layout = RhiPipelineLayout::new(
            &rhi,
            &[set_layout.handle()],
            &[push_constants.vk_range()],
            "scale-bias-pipeline-layout",
        );
        let shader_module =
            RhiShaderModule::from_spirv(rhi.device().clone(), &compile_wgsl_compute(SCALE_BIAS_WGSL, "main"), "scale-bias-cs");
        let pipeline = RhiPipeline::new_compute(&rhi, &pipeline_layout, &shader_module, c"main", "scale-bias-pipeline");
        shader_module.destroy();

        let mut cmd = init_command_buffer(&rhi, &rhi.compute_command_pool, rhi.compute_queue(), "scale-bias-dispatch");
        cmd.begin_recording().unwrap();
        cmd.bind_pipeline(vk::PipelineBindPoint::COMPUTE, &pipeline);
        cmd.bind_descriptor_set(vk::PipelineBindPoint::COMPUTE, &pipeline_layout, &descriptor_set);
        cmd.push_constants(&pipeline_layout, &push_constants);
        cmd.dispatch(8, 8, 1);
        cmd.end_recording().unwrap();
        cmd.submit().unwrap();
        assert_eq!(cmd.submission_id().value(), 1);

        let result: Vec<u32> = buffer.read_data_by_mem_map(ELEMENT_COUNT);
        for (i, value) in result.iter().enumerate() {
            assert_eq!(*value, i as u32 * 3 + 7, "element {i} mismatch");
        }

        rhi.compute_command_pool.free_command_buffer(cmd.handle());
    }
    rhi.destroy();
}

/// render pass 内 clear_attachments，然后把 attachment 拷回 host 验证颜色
#[test]
fn test_render_pass_clear_attachments_readback() {
    let Some(rhi) = try_create_rhi("test-render-pass-clear") else {
        return;
    };
    {
        let extent = vk::Extent2D { width: 64, height: 64 };
        let format = vk::Format::R8G8B8A8_UNORM;
        let byte_count = (extent.width * extent.height * 4) as usize;

        let texture = RhiTexture2D::new(
            &rhi,
            extent,
            format,
            vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_SRC,
            "clear-target",
        );
        let framebuffer = RhiFrameBuffer::new(&rhi, &[texture.image_view()], format, extent, "clear-target-fb");
        let mut readback = RhiBuffer::new_readback_buffer(&rhi, byte_count as vk::DeviceSize, "clear-readback");

        let mut cmd = init_command_buffer(&rhi, &rhi.graphics_command_pool, rhi.graphics_queue(), "clear-attachments");
        cmd.begin_recording().unwrap();

        // attachment 在 render pass 里以 GENERAL 布局使用，先从 UNDEFINED 转过去
        cmd.image_memory_barrier(
            vk::DependencyFlags::empty(),
            &[RhiImageBarrier::new()
                .image(texture.image())
                .image_aspect_flag(vk::ImageAspectFlags::COLOR)
                .layout_transfer(vk::ImageLayout::UNDEFINED, vk::ImageLayout::GENERAL)
                .dst_mask(
                    vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT,
                    vk::AccessFlags2::COLOR_ATTACHMENT_READ | vk::AccessFlags2::COLOR_ATTACHMENT_WRITE,
                )],
        );

        cmd.begin_render_pass(&framebuffer);
        cmd.clear_attachments(
            &[vk::ClearAttachment {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                color_attachment: 0,
                clear_value: vk::ClearValue {
                    color: vk::ClearColorValue { float32: [0.0, 0.0, 1.0, 1.0] },
                },
            }],
            &[vk::ClearRect {
                rect: vk::Rect2D { offset: vk::Offset2D::default(), extent },
                base_array_layer: 0,
                layer_count: 1,
            }],
        );
        cmd.end_render_pass(&framebuffer);

        cmd.image_memory_barrier(
            vk::DependencyFlags::empty(),
            &[RhiImageBarrier::new()
                .image(texture.image())
                .image_aspect_flag(vk::ImageAspectFlags::COLOR)
                .layout_transfer(vk::ImageLayout::GENERAL, vk::ImageLayout::TRANSFER_SRC_OPTIMAL)
                .mask(RhiBarrierMask {
                    src_stage: vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT,
                    src_access: vk::AccessFlags2::COLOR_ATTACHMENT_WRITE,
                    dst_stage: vk::PipelineStageFlags2::TRANSFER,
                    dst_access: vk::AccessFlags2::TRANSFER_READ,
                })],
        );
        cmd.copy_texture_to_buffer(
            &texture,
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            &readback,
            &[texture.full_copy_region()],
        );

        cmd.end_recording().unwrap();
        cmd.submit().unwrap();

        let pixels: Vec<u8> = readback.read_data_by_mem_map(byte_count);
        for pixel in pixels.chunks_exact(4) {
            assert_eq!(pixel, [0, 0, 255, 255], "expected pure blue");
        }

        rhi.graphics_command_pool.free_command_buffer(cmd.handle());
    }
    rhi.destroy();
}

/// buffer -> texture -> buffer 的搬运闭环，走 transfer queue
#[test]
fn test_texture_upload_download_round_trip() {
    let Some(rhi) = try_create_rhi("test-texture-round-trip") else {
        return;
    };
    {
        let extent = vk::Extent2D { width: 32, height: 32 };
        let byte_count = (extent.width * extent.height * 4) as usize;

        let texture = RhiTexture2D::new(
            &rhi,
            extent,
            vk::Format::R8G8B8A8_UNORM,
            vk::ImageUsageFlags::TRANSFER_SRC | vk::ImageUsageFlags::TRANSFER_DST,
            "round-trip-image",
        );

        let pattern: Vec<u8> = (0..byte_count).map(|i| (i * 7 + 3) as u8).collect();
        let mut stage = RhiBuffer::new_stage_buffer(&rhi, byte_count as vk::DeviceSize, "round-trip-upload");
        stage.transfer_data_by_mem_map(&pattern);
        let mut readback = RhiBuffer::new_readback_buffer(&rhi, byte_count as vk::DeviceSize, "round-trip-download");

        let mut cmd = init_command_buffer(&rhi, &rhi.transfer_command_pool, rhi.transfer_queue(), "round-trip-copy");
        cmd.begin_recording().unwrap();
        cmd.image_memory_barrier(
            vk::DependencyFlags::empty(),
            &[RhiImageBarrier::new()
                .image(texture.image())
                .image_aspect_flag(vk::ImageAspectFlags::COLOR)
                .layout_transfer(vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                .dst_mask(vk::PipelineStageFlags2::TRANSFER, vk::AccessFlags2::TRANSFER_WRITE)],
        );
        cmd.copy_buffer_to_texture(
            &stage,
            &texture,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            &[texture.full_copy_region()],
        );
        cmd.image_memory_barrier(
            vk::DependencyFlags::empty(),
            &[RhiImageBarrier::new()
                .image(texture.image())
                .image_aspect_flag(vk::ImageAspectFlags::COLOR)
                .layout_transfer(vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::TRANSFER_SRC_OPTIMAL)
                .mask(RhiBarrierMask {
                    src_stage: vk::PipelineStageFlags2::TRANSFER,
                    src_access: vk::AccessFlags2::TRANSFER_WRITE,
                    dst_stage: vk::PipelineStageFlags2::TRANSFER,
                    dst_access: vk::AccessFlags2::TRANSFER_READ,
                })],
        );
        cmd.copy_texture_to_buffer(
            &texture,
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            &readback,
            &[texture.full_copy_region()],
        );
        cmd.end_recording().unwrap();
        cmd.submit().unwrap();

        let downloaded: Vec<u8> = readback.read_data_by_mem_map(byte_count);
        assert_eq!(downloaded, pattern);

        rhi.transfer_command_pool.free_command_buffer(cmd.handle());
    }
    rhi.destroy();
}

/// one_time_exec 的闭包返回值会透传，fill_buffer 的结果可以读回
#[test]
fn test_fill_buffer_one_time_exec() {
    let Some(rhi) = try_create_rhi("test-fill-buffer") else {
        return;
    };
    {
        const WORD_COUNT: usize = 256;
        let mut buffer = RhiBuffer::new_storage_buffer(
            &rhi,
            (WORD_COUNT * size_of::<u32>()) as vk::DeviceSize,
            "fill-target",
        );

        let id_during_recording = RhiCommandBuffer::one_time_exec(
            &rhi,
            &rhi.transfer_command_pool,
            rhi.transfer_queue().clone(),
            |cmd| {
                cmd.fill_buffer(&buffer, 0xDEAD_BEEF);
                cmd.submission_id().value()
            },
            "fill-buffer",
        )
        .unwrap();

        // 闭包的返回值透传；录制期间 submission id 尚未推进
        assert_eq!(id_during_recording, 0);

        let words: Vec<u32> = buffer.read_data_by_mem_map(WORD_COUNT);
        assert!(words.iter().all(|word| *word == 0xDEAD_BEEF));
    }
    rhi.destroy();
}

/// render pass 之外的 clear_color_image，GENERAL 布局下读回验证
#[test]
fn test_clear_color_image_readback() {
    let Some(rhi) = try_create_rhi("test-clear-color-image") else {
        return;
    };
    {
        let extent = vk::Extent2D { width: 32, height: 32 };
        let byte_count = (extent.width * extent.height * 4) as usize;

        let texture = RhiTexture2D::new(
            &rhi,
            extent,
            vk::Format::R8G8B8A8_UNORM,
            vk::ImageUsageFlags::TRANSFER_SRC | vk::ImageUsageFlags::TRANSFER_DST,
            "clear-color-image",
        );
        let mut readback = RhiBuffer::new_readback_buffer(&rhi, byte_count as vk::DeviceSize, "clear-color-readback");

        RhiCommandBuffer::one_time_exec(
            &rhi,
            &rhi.graphics_command_pool,
            rhi.graphics_queue().clone(),
            |cmd| {
                cmd.image_memory_barrier(
                    vk::DependencyFlags::empty(),
                    &[RhiImageBarrier::new()
                        .image(texture.image())
                        .image_aspect_flag(vk::ImageAspectFlags::COLOR)
                        .layout_transfer(vk::ImageLayout::UNDEFINED, vk::ImageLayout::GENERAL)
                        .dst_mask(vk::PipelineStageFlags2::TRANSFER, vk::AccessFlags2::TRANSFER_WRITE)],
                );
                cmd.clear_color_image(
                    &texture,
                    vk::ImageLayout::GENERAL,
                    vk::ClearColorValue { float32: [1.0, 0.0, 0.0, 1.0] },
                    &[texture.whole_subresource_range()],
                );
                // 布局保持 GENERAL，只做 transfer write -> read 的可见性
                cmd.image_memory_barrier(
                    vk::DependencyFlags::empty(),
                    &[RhiImageBarrier::new()
                        .image(texture.image())
                        .image_aspect_flag(vk::ImageAspectFlags::COLOR)
                        .layout_transfer(vk::ImageLayout::GENERAL, vk::ImageLayout::GENERAL)
                        .mask(RhiBarrierMask {
                            src_stage: vk::PipelineStageFlags2::TRANSFER,
                            src_access: vk::AccessFlags2::TRANSFER_WRITE,
                            dst_stage: vk::PipelineStageFlags2::TRANSFER,
                            dst_access: vk::AccessFlags2::TRANSFER_READ,
                        })],
                );
                cmd.copy_texture_to_buffer(
                    &texture,
                    vk::ImageLayout::GENERAL,
                    &readback,
                    &[texture.full_copy_region()],
                );
            },
            "clear-color-image",
        )
        .unwrap();

        let pixels: Vec<u8> = readback.read_data_by_mem_map(byte_count);
        for pixel in pixels.chunks_exact(4) {
            assert_eq!(pixel, [255, 0, 0, 255], "expected pure red");
        }
    }
    rhi.destroy();
}
