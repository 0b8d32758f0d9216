//! 哈希方案能力约定
//!
//! 每个算法插件都实现 [`Scheme`]：统一的生成 / 验证入口 [`Scheme::derive`]
//! 以及自注册 [`Scheme::register`]。可选的强度评估能力通过
//! [`Scheme::preference`] 查询，而不是通过继承。

use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::registry::Registry;

/// 哈希方案插件
///
/// 实现必须是无状态的：参数配置在构造时确定，单次调用不修改共享状态，
/// 因此可以被任意多个线程同时调用。
///
/// ## 示例
///
/// ```rust
/// use std::sync::Arc;
/// use passwd::{Error, Registry, Result, Scheme};
/// use passwd::random::constant_time_compare;
///
/// /// 明文存储，仅用于演示
/// #[derive(Debug)]
/// struct Plain;
///
/// impl Scheme for Plain {
///     fn derive(&self, password: &[u8], stored: Option<&[u8]>) -> Result<Vec<u8>> {
///         let encoded = [b"$plain$".as_slice(), password].concat();
///         match stored {
///             None => Ok(encoded),
///             Some(stored) if constant_time_compare(&encoded, stored) => Ok(stored.to_vec()),
///             Some(stored) => Err(Error::no_match(stored)),
///         }
///     }
///
///     fn register(self: Arc<Self>, registry: &mut Registry) {
///         registry.register("plain", self);
///     }
/// }
///
/// let registry = Registry::new().with(Plain);
/// let hash = registry.authenticate(b"secret", None).unwrap();
/// assert_eq!(hash, b"$plain$secret");
/// ```
pub trait Scheme: Send + Sync + fmt::Debug {
    /// 生成或验证密码哈希
    ///
    /// - `stored` 为 `None`：使用当前参数配置和新盐值生成哈希
    /// - `stored` 为 `Some`：按本方案格式解码，使用哈希中的参数和盐值重新计算，
    ///   常量时间比较摘要；成功时原样返回 `stored`
    ///
    /// # Errors
    ///
    /// - `BadHash`: 哈希不符合本方案格式
    /// - `NoMatch`: 摘要不一致
    /// - `Derivation`: 密钥派生或随机数生成失败
    fn derive(&self, password: &[u8], stored: Option<&[u8]>) -> Result<Vec<u8>>;

    /// 将自身注册到注册表
    ///
    /// 通常以自己的标签调用 [`Registry::register`]，也可以同时声明
    /// 默认或兜底角色。
    fn register(self: Arc<Self>, registry: &mut Registry);

    /// 可选的强度评估能力
    fn preference(&self) -> Option<&dyn Preference> {
        None
    }
}

/// 强度评估能力
pub trait Preference {
    /// 哈希的每个强度参数是否都不低于当前配置
    ///
    /// 无法按本方案格式解析的哈希一律返回 false。
    fn is_preferred(&self, stored: &[u8]) -> bool;
}
