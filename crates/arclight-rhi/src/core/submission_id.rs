/// 一次 submit-to-completion 周期的标识
///
/// 严格单调递增，每次提交完成后 +1，从不复用。外部代码可以缓存某个资源
/// 最后一次被使用时的 id，和当前 id 比较来判断资源是否可以安全复用。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RhiSubmissionId(u64);

impl RhiSubmissionId {
    /// 推进到下一个周期，只允许 command buffer 在 fence 等待完成之后调用
    #[inline]
    pub(crate) fn advance(&mut self) {
        self.0 += 1;
    }

    #[inline]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RhiSubmissionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "submission-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submission_id_advances_by_one() {
        let mut id = RhiSubmissionId::default();
        assert_eq!(id.value(), 0);

        id.advance();
        assert_eq!(id.value(), 1);

        id.advance();
        assert_eq!(id.value(), 2);
    }

    #[test]
    fn test_submission_id_ordering() {
        let old = RhiSubmissionId::default();
        let mut new = old;
        new.advance();

        // 外部的资源复用逻辑依赖这个比较
        assert!(old < new);
        assert_ne!(old, new);
    }
}
