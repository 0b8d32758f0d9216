//! 统一错误类型模块
//!
//! 提供 passwd 库中所有操作的错误类型定义。
//!
//! 错误分为三类认证相关错误（`BadHash` / `NoMatch` / `NoHandler`）、
//! 派生失败以及配置错误。库本身不会记录任何错误，是否向最终用户区分
//! 这些错误由调用方决定。

use std::fmt;

/// passwd 库的统一结果类型
pub type Result<T> = std::result::Result<T, Error>;

/// passwd 库的错误类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// 存储的哈希不符合所选方案的格式
    BadHash(String),

    /// 密码与哈希不匹配
    ///
    /// `stored` 为调用时传入的原哈希，仅供审计使用，不能视为已验证。
    NoMatch {
        /// 原始存储的哈希
        stored: Vec<u8>,
    },

    /// 没有可处理该哈希的方案
    ///
    /// `tag` 为 `None` 表示哈希没有标签，或者没有设置默认方案。
    NoHandler {
        /// 哈希中解析出的标签
        tag: Option<String>,
    },

    /// 密钥派生或随机数生成失败
    Derivation(String),

    /// 配置错误
    Config(ConfigError),
}

impl Error {
    /// 创建一个格式错误
    pub fn bad_hash(msg: impl Into<String>) -> Self {
        Error::BadHash(msg.into())
    }

    /// 创建一个不匹配错误，附带原始哈希
    pub fn no_match(stored: &[u8]) -> Self {
        Error::NoMatch {
            stored: stored.to_vec(),
        }
    }

    /// 创建一个派生失败错误
    pub fn derivation(msg: impl Into<String>) -> Self {
        Error::Derivation(msg.into())
    }

    /// 是否为格式错误
    pub fn is_bad_hash(&self) -> bool {
        matches!(self, Error::BadHash(_))
    }

    /// 是否为密码不匹配
    pub fn is_no_match(&self) -> bool {
        matches!(self, Error::NoMatch { .. })
    }

    /// 是否为无可用方案
    pub fn is_no_handler(&self) -> bool {
        matches!(self, Error::NoHandler { .. })
    }

    /// 是否为派生失败
    pub fn is_derivation(&self) -> bool {
        matches!(self, Error::Derivation(_))
    }

    /// 不匹配时返回原始存储的哈希
    pub fn stored_hash(&self) -> Option<&[u8]> {
        match self {
            Error::NoMatch { stored } => Some(stored),
            _ => None,
        }
    }
}

/// 配置相关错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// 无效的配置值
    InvalidValue { key: String, message: String },
}

impl ConfigError {
    /// 创建一个无效值错误
    pub fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }
}

// ============================================================================
// Display 实现
// ============================================================================

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BadHash(msg) => write!(f, "password hash is malformed: {}", msg),
            Error::NoMatch { .. } => write!(f, "password does not match"),
            Error::NoHandler { tag: Some(tag) } => {
                write!(f, "password handler not registered: {}", tag)
            }
            Error::NoHandler { tag: None } => write!(f, "password handler not registered"),
            Error::Derivation(msg) => write!(f, "key derivation failed: {}", msg),
            Error::Config(e) => write!(f, "Config error: {}", e),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidValue { key, message } => {
                write!(f, "invalid configuration value for '{}': {}", key, message)
            }
        }
    }
}

// ============================================================================
// std::error::Error 实现
// ============================================================================

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// From 实现
// ============================================================================

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::bad_hash("missing salt");
        assert_eq!(err.to_string(), "password hash is malformed: missing salt");

        let err = Error::NoHandler {
            tag: Some("foo".to_string()),
        };
        assert_eq!(err.to_string(), "password handler not registered: foo");

        let err = Error::NoHandler { tag: None };
        assert_eq!(err.to_string(), "password handler not registered");
    }

    #[test]
    fn test_no_match_hides_stored_hash() {
        let err = Error::no_match(b"$1$secret");
        assert_eq!(err.to_string(), "password does not match");
        assert_eq!(err.stored_hash(), Some(&b"$1$secret"[..]));
    }

    #[test]
    fn test_error_predicates() {
        assert!(Error::bad_hash("x").is_bad_hash());
        assert!(Error::no_match(b"x").is_no_match());
        assert!(Error::NoHandler { tag: None }.is_no_handler());
        assert!(Error::derivation("x").is_derivation());
        assert!(!Error::derivation("x").is_no_match());
        assert_eq!(Error::bad_hash("x").stored_hash(), None);
    }

    #[test]
    fn test_error_from_config() {
        let err: Error = ConfigError::invalid("n", "must be a power of two").into();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(
            err.to_string(),
            "Config error: invalid configuration value for 'n': must be a power of two"
        );
    }
}
