//! 安全随机数与常量时间比较模块
//!
//! 盐值的随机来源以 [`SaltSource`] trait 的形式注入各个方案，默认使用
//! 操作系统提供的密码学安全随机数生成器 (CSPRNG)。

use std::fmt;
use std::sync::Arc;

use rand::{TryRngCore, rngs::OsRng};

use crate::error::{Error, Result};

/// 盐值随机来源
///
/// 实现必须适用于密码学用途，且每次调用都产生新的随机数据。
pub trait SaltSource: Send + Sync + fmt::Debug {
    /// 用随机字节填满 `buf`
    fn fill(&self, buf: &mut [u8]) -> Result<()>;
}

/// 基于操作系统 CSPRNG 的盐值来源
#[derive(Debug, Clone, Copy, Default)]
pub struct OsSaltSource;

impl SaltSource for OsSaltSource {
    fn fill(&self, buf: &mut [u8]) -> Result<()> {
        OsRng
            .try_fill_bytes(buf)
            .map_err(|e| Error::derivation(format!("random number generation failed: {:?}", e)))
    }
}

/// 返回默认的共享盐值来源
pub fn os_salt_source() -> Arc<dyn SaltSource> {
    Arc::new(OsSaltSource)
}

/// 从指定来源生成指定长度的盐值
///
/// # Example
///
/// ```rust
/// use passwd::random::{OsSaltSource, generate_salt};
///
/// let salt = generate_salt(&OsSaltSource, 16).unwrap();
/// assert_eq!(salt.len(), 16);
/// ```
pub fn generate_salt(source: &dyn SaltSource, length: usize) -> Result<Vec<u8>> {
    let mut salt = vec![0u8; length];
    source.fill(&mut salt)?;
    Ok(salt)
}

/// 常量时间比较两个字节切片
///
/// 用于防止时序攻击。长度不同时直接返回 false（长度本身不是秘密）。
///
/// # Example
///
/// ```rust
/// use passwd::random::constant_time_compare;
///
/// assert!(constant_time_compare(b"digest", b"digest"));
/// assert!(!constant_time_compare(b"digest", b"digesT"));
/// ```
pub fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    use subtle::ConstantTimeEq;
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_salt() {
        let salt = generate_salt(&OsSaltSource, 16).unwrap();
        assert_eq!(salt.len(), 16);

        // 两次生成不应相同
        let salt2 = generate_salt(&OsSaltSource, 16).unwrap();
        assert_ne!(salt, salt2);
    }

    #[test]
    fn test_generate_empty_salt() {
        assert!(generate_salt(&OsSaltSource, 0).unwrap().is_empty());
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare(b"hello", b"hello"));
        assert!(!constant_time_compare(b"hello", b"world"));
        assert!(!constant_time_compare(b"hello", b"hell"));
        assert!(constant_time_compare(b"", b""));
    }
}
