//! Vulkan RHI (Rendering Hardware Interface) 抽象层
//!
//! 核心是 [`core::command_buffer::RhiCommandBuffer`]：一个显式状态机，
//! 负责命令的录制、提交以及 host 与 device 之间的同步。
//! 所有 Vulkan 对象通过 [`rhi::Rhi`] 创建，资源封装位于 [`core`] 下。

pub mod basic;
pub mod core;
pub mod rhi;
pub mod vulkan_context;

/// 设备层面的失败（submit 被拒绝、fence 等待出错等）以 vk 错误码向调用方传播；
/// 状态机的误用则直接 panic，不属于这里的错误路径
pub type RhiResult<T> = Result<T, ash::vk::Result>;
