use ash::vk;

/// push constant 数据的实际存储方式
///
/// 数据量超过 device limit 时退化为 uniform buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RhiPushConstantStorage {
    PushConstants,
    UniformBuffer,
}

/// shader 常量数据的 host 侧镜像
///
/// 构造时根据 maxPushConstantsSize 决定存储方式：
/// 放得下就走 vkCmdPushConstants，放不下就需要调用方将数据放入 uniform buffer
pub struct RhiPushConstants {
    storage: RhiPushConstantStorage,
    stage_flags: vk::ShaderStageFlags,
    data: Vec<u8>,
}

impl RhiPushConstants {
    pub fn new(max_push_constants_size: u32, stage_flags: vk::ShaderStageFlags, size: usize) -> Self {
        let storage = if size as u32 <= max_push_constants_size {
            RhiPushConstantStorage::PushConstants
        } else {
            RhiPushConstantStorage::UniformBuffer
        };

        Self {
            storage,
            stage_flags,
            data: vec![0; size],
        }
    }

    #[inline]
    pub fn storage(&self) -> RhiPushConstantStorage {
        self.storage
    }

    #[inline]
    pub fn stage_flags(&self) -> vk::ShaderStageFlags {
        self.stage_flags
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 用于 pipeline layout 的 push constant range
    #[inline]
    pub fn vk_range(&self) -> vk::PushConstantRange {
        vk::PushConstantRange {
            stage_flags: self.stage_flags,
            offset: 0,
            size: self.data.len() as u32,
        }
    }

    /// 向 host 侧镜像写入数据，之后通过 cmd 推送到 GPU
    pub fn write(&mut self, offset: usize, bytes: &[u8]) {
        assert!(offset + bytes.len() <= self.data.len(), "push constant write out of range");
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    #[inline]
    pub fn write_pod<T: bytemuck::Pod>(&mut self, offset: usize, value: &T) {
        self.write(offset, bytemuck::bytes_of(value));
    }

    pub(crate) fn require_push_storage(&self) {
        assert_eq!(
            self.storage,
            RhiPushConstantStorage::PushConstants,
            "constants stored in a uniform buffer cannot be pushed, bind them through a descriptor set instead"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_selection() {
        let pc = RhiPushConstants::new(128, vk::ShaderStageFlags::COMPUTE, 64);
        assert_eq!(pc.storage(), RhiPushConstantStorage::PushConstants);

        let pc = RhiPushConstants::new(128, vk::ShaderStageFlags::COMPUTE, 256);
        assert_eq!(pc.storage(), RhiPushConstantStorage::UniformBuffer);
    }

    #[test]
    fn test_exact_limit_still_uses_push_constants() {
        let pc = RhiPushConstants::new(128, vk::ShaderStageFlags::COMPUTE, 128);
        assert_eq!(pc.storage(), RhiPushConstantStorage::PushConstants);
    }

    #[test]
    fn test_write_and_read_back() {
        let mut pc = RhiPushConstants::new(128, vk::ShaderStageFlags::COMPUTE, 16);
        pc.write(4, &[1, 2, 3, 4]);

        assert_eq!(pc.bytes()[0..4], [0, 0, 0, 0]);
        assert_eq!(pc.bytes()[4..8], [1, 2, 3, 4]);
        assert_eq!(pc.size(), 16);
    }

    #[test]
    fn test_write_pod() {
        let mut pc = RhiPushConstants::new(128, vk::ShaderStageFlags::COMPUTE, 8);
        pc.write_pod(0, &0xdeadbeef_u32);

        assert_eq!(pc.bytes()[0..4], 0xdeadbeef_u32.to_ne_bytes());
    }

    #[test]
    #[should_panic(expected = "push constant write out of range")]
    fn test_write_out_of_range() {
        let mut pc = RhiPushConstants::new(128, vk::ShaderStageFlags::COMPUTE, 8);
        pc.write(4, &[0; 8]);
    }

    #[test]
    fn test_vk_range() {
        let pc = RhiPushConstants::new(128, vk::ShaderStageFlags::COMPUTE, 32);
        let range = pc.vk_range();

        assert_eq!(range.stage_flags, vk::ShaderStageFlags::COMPUTE);
        assert_eq!(range.offset, 0);
        assert_eq!(range.size, 32);
    }

    #[test]
    #[should_panic(expected = "uniform buffer")]
    fn test_uniform_buffer_storage_rejects_push() {
        let pc = RhiPushConstants::new(128, vk::ShaderStageFlags::COMPUTE, 256);
        pc.require_push_storage();
    }
}
