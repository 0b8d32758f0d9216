//! # passwd
//!
//! 多种密码哈希方案并存的验证与生成库，并在存储的哈希需要升级到更强方案时通知调用方。
//!
//! ## 功能特性
//!
//! - **方案注册表**: 按哈希中的标签自动分发到对应方案
//! - **旧格式兼容**: 无标签或未知标签的哈希交给兜底方案处理
//! - **透明升级**: [`Registry::is_preferred`] 判断哈希是否满足当前默认方案和参数
//! - **常量时间比较**: 摘要比较使用 `subtle`，防止时序攻击
//! - **可插拔方案**: 实现 [`Scheme`] trait 即可接入自定义算法
//!
//! ## Features
//!
//! - `argon2` - Argon2id / Argon2i（默认启用）
//! - `scrypt` - scrypt `s1` / `s2`（默认启用）
//! - `unix` - MD5 与 bcrypt 旧格式（默认启用）
//! - `full` - 启用所有方案
//!
//! ## 示例
//!
//! ```rust
//! use passwd::Registry;
//!
//! let registry = Registry::recommended();
//!
//! // 旧的 MD5 哈希仍然可以验证
//! let legacy = b"$1$76a2173be6393254e72ffa4d6df1030a";
//! let upgrade = registry.upgrade(b"passwd", legacy).unwrap();
//! assert_eq!(upgrade.verified, legacy);
//!
//! // 但不满足默认方案，需要重新生成并持久化
//! let replacement = upgrade.replacement.unwrap();
//! assert!(replacement.starts_with(b"$argon2id$"));
//! assert!(registry.is_preferred(&replacement));
//! ```
//!
//! ## 错误处理
//!
//! 所有错误都直接返回给调用方，库内部不重试也不记录。`BadHash` / `NoMatch` /
//! `NoHandler` 的区别对调用方可见，是否向最终用户隐藏由调用方决定。
//!
//! ## 并发
//!
//! 注册表在初始化阶段通过 `&mut` 构建，之后可放入 `Arc` 在多个线程间共享。
//! 单次调用是同步且 CPU 密集的，建议在独立的工作线程池中执行。

pub mod encoding;
pub mod error;
pub mod random;
pub mod registry;
pub mod scheme;
pub mod schemes;

pub use error::{ConfigError, Error, Result};
pub use registry::{Registry, Tag, Upgrade};
pub use scheme::{Preference, Scheme};

// ============================================================================
// 方案导出
// ============================================================================

#[cfg(feature = "argon2")]
pub use schemes::{Argon2Profile, Argon2Scheme, Argon2Variant};
#[cfg(feature = "scrypt")]
pub use schemes::{ScryptFormat, ScryptProfile, ScryptScheme};
#[cfg(feature = "unix")]
pub use schemes::{BcryptProfile, BcryptScheme, Md5Scheme};

pub use encoding::ParamParsing;
pub use random::{OsSaltSource, SaltSource};
