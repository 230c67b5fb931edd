//! 离屏示例：不开窗口，在同一个 command buffer 上连续录制并提交多轮命令，
//! 每轮结束后把结果拷回 host 端验证

use anyhow::Result;
use arclight_crate_tools::init_log::init_log;
use arclight_rhi::basic::color::LabelColor;
use arclight_rhi::core::buffer::RhiBuffer;
use arclight_rhi::core::command_buffer::RhiCommandBuffer;
use arclight_rhi::core::framebuffer::RhiFrameBuffer;
use arclight_rhi::core::synchronize::{RhiBarrierMask, RhiImageBarrier};
use arclight_rhi::core::texture::RhiTexture2D;
use arclight_rhi::rhi::Rhi;
use ash::vk;

const EXTENT: vk::Extent2D = vk::Extent2D { width: 64, height: 64 };
const PIXEL_BYTES: usize = (EXTENT.width * EXTENT.height * 4) as usize;

fn main() -> Result<()> {
    init_log();

    let rhi = Rhi::new("arclight-offscreen".to_string(), vec![]);
    run_offscreen(&rhi)?;
    rhi.destroy();

    log::info!("offscreen demo finished");
    Ok(())
}

fn run_offscreen(rhi: &Rhi) -> Result<()> {
    let texture = RhiTexture2D::new(
        rhi,
        EXTENT,
        vk::Format::R8G8B8A8_UNORM,
        vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_SRC | vk::ImageUsageFlags::TRANSFER_DST,
        "offscreen-target",
    );
    let framebuffer = RhiFrameBuffer::new(rhi, &[texture.image_view()], texture.format(), EXTENT, "offscreen-fb");

    let gradient: Vec<u8> = (0..PIXEL_BYTES).map(|i| (i * 13 + 1) as u8).collect();
    let mut upload = RhiBuffer::new_stage_buffer(rhi, PIXEL_BYTES as vk::DeviceSize, "offscreen-upload");
    upload.transfer_data_by_mem_map(&gradient);
    let mut readback = RhiBuffer::new_readback_buffer(rhi, PIXEL_BYTES as vk::DeviceSize, "offscreen-readback");

    let handle = rhi.graphics_command_pool.allocate_command_buffer("offscreen");
    let mut cmd = RhiCommandBuffer::new();
    cmd.init(rhi.device().clone(), rhi.graphics_queue().clone(), handle, "offscreen");

    // 第 1 轮：把渐变图案经 staging buffer 上传到 texture，再拷回来比对
    cmd.begin_recording()?;
    cmd.begin_label("upload-round", LabelColor::COLOR_STAGE);
    cmd.image_memory_barrier(
        vk::DependencyFlags::empty(),
        &[RhiImageBarrier::new()
            .image(texture.image())
            .image_aspect_flag(vk::ImageAspectFlags::COLOR)
            .layout_transfer(vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL)
            .dst_mask(vk::PipelineStageFlags2::TRANSFER, vk::AccessFlags2::TRANSFER_WRITE)],
    );
    cmd.copy_buffer_to_texture(&upload, &texture, vk::ImageLayout::TRANSFER_DST_OPTIMAL, &[texture.full_copy_region()]);
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
    cmd.copy_texture_to_buffer(&texture, vk::ImageLayout::TRANSFER_SRC_OPTIMAL, &readback, &[texture.full_copy_region()]);
    cmd.end_label();
    cmd.end_recording()?;
    cmd.submit()?;

    let downloaded: Vec<u8> = readback.read_data_by_mem_map(PIXEL_BYTES);
    anyhow::ensure!(downloaded == gradient, "uploaded texture does not match the gradient pattern");
    log::info!("round 1 done, gradient verified, {}", cmd.submission_id());

    // 第 2 轮：render pass 之外 clear 成 magenta
    cmd.begin_recording()?;
    cmd.begin_label("clear-image-round", LabelColor::COLOR_STAGE);
    cmd.image_memory_barrier(
        vk::DependencyFlags::empty(),
        &[RhiImageBarrier::new()
            .image(texture.image())
            .image_aspect_flag(vk::ImageAspectFlags::COLOR)
            .layout_transfer(vk::ImageLayout::TRANSFER_SRC_OPTIMAL, vk::ImageLayout::GENERAL)
            .mask(RhiBarrierMask {
                src_stage: vk::PipelineStageFlags2::TRANSFER,
                src_access: vk::AccessFlags2::TRANSFER_READ,
                dst_stage: vk::PipelineStageFlags2::TRANSFER,
                dst_access: vk::AccessFlags2::TRANSFER_WRITE,
            })],
    );
    cmd.clear_color_image(
        &texture,
        vk::ImageLayout::GENERAL,
        vk::ClearColorValue { float32: [1.0, 0.0, 1.0, 1.0] },
        &[texture.whole_subresource_range()],
    );
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
    cmd.copy_texture_to_buffer(&texture, vk::ImageLayout::GENERAL, &readback, &[texture.full_copy_region()]);
    cmd.end_label();
    cmd.end_recording()?;
    cmd.submit()?;

    let pixels: Vec<u8> = readback.read_data_by_mem_map(PIXEL_BYTES);
    ensure_solid_color(&pixels, [255, 0, 255, 255], "clear_color_image")?;
    log::info!("round 2 done, magenta verified, {}", cmd.submission_id());

    // 第 3 轮：render pass 里 clear_attachments 成绿色
    cmd.begin_recording()?;
    cmd.image_memory_barrier(
        vk::DependencyFlags::empty(),
        &[RhiImageBarrier::new()
            .image(texture.image())
            .image_aspect_flag(vk::ImageAspectFlags::COLOR)
            .layout_transfer(vk::ImageLayout::GENERAL, vk::ImageLayout::GENERAL)
            .mask(RhiBarrierMask {
                src_stage: vk::PipelineStageFlags2::TRANSFER,
                src_access: vk::AccessFlags2::TRANSFER_READ,
                dst_stage: vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT,
                dst_access: vk::AccessFlags2::COLOR_ATTACHMENT_READ | vk::AccessFlags2::COLOR_ATTACHMENT_WRITE,
            })],
    );
    cmd.begin_render_pass(&framebuffer);
    cmd.clear_attachments(
        &[vk::ClearAttachment {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            color_attachment: 0,
            clear_value: vk::ClearValue {
                color: vk::ClearColorValue { float32: [0.0, 1.0, 0.0, 1.0] },
            },
        }],
        &[vk::ClearRect {
            rect: vk::Rect2D { offset: vk::Offset2D::default(), extent: EXTENT },
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
            .layout_transfer(vk::ImageLayout::GENERAL, vk::ImageLayout::GENERAL)
            .mask(RhiBarrierMask {
                src_stage: vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT,
                src_access: vk::AccessFlags2::COLOR_ATTACHMENT_WRITE,
                dst_stage: vk::PipelineStageFlags2::TRANSFER,
                dst_access: vk::AccessFlags2::TRANSFER_READ,
            })],
    );
    cmd.copy_texture_to_buffer(&texture, vk::ImageLayout::GENERAL, &readback, &[texture.full_copy_region()]);
    cmd.end_recording()?;
    cmd.submit()?;

    let pixels: Vec<u8> = readback.read_data_by_mem_map(PIXEL_BYTES);
    ensure_solid_color(&pixels, [0, 255, 0, 255], "clear_attachments")?;
    log::info!("round 3 done, green verified, {}", cmd.submission_id());

    // 加一轮 one_time_exec：transfer queue 上 fill buffer
    let mut scratch = RhiBuffer::new_storage_buffer(rhi, 1024, "offscreen-scratch");
    RhiCommandBuffer::one_time_exec(
        rhi,
        &rhi.transfer_command_pool,
        rhi.transfer_queue().clone(),
        |one_time| one_time.fill_buffer(&scratch, 0x4242_4242),
        "fill-scratch",
    )?;
    let words: Vec<u32> = scratch.read_data_by_mem_map(256);
    anyhow::ensure!(words.iter().all(|word| *word == 0x4242_4242), "fill_buffer pattern mismatch");
    log::info!("scratch buffer filled and verified");

    rhi.graphics_command_pool.free_command_buffer(cmd.handle());
    Ok(())
}

fn ensure_solid_color(pixels: &[u8], expected: [u8; 4], what: &str) -> Result<()> {
    for (i, pixel) in pixels.chunks_exact(4).enumerate() {
        anyhow::ensure!(pixel == expected, "{} pixel {} is {:?}, expected {:?}", what, i, pixel, expected);
    }
    Ok(())
}
