//! Argon2 方案
//!
//! 哈希格式：`$<name>$v=<ver>,m=<mem>,t=<time>,p=<par>$<b64-salt>$<b64-digest>`
//!
//! - `name` 为 `argon2i` 或 `argon2id`
//! - 参数段为逗号分隔的 `key=value` 列表，未知的键被忽略，缺失的键取当前配置值
//! - 盐值与摘要使用无填充的标准 base64

use std::sync::Arc;

use ::argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};

use crate::encoding::{DELIMITER, ParamParsing, SegmentEncoding, cut, push_tag, strip_tag};
use crate::error::{ConfigError, Error, Result};
use crate::random::{SaltSource, constant_time_compare, generate_salt, os_salt_source};
use crate::registry::Registry;
use crate::scheme::{Preference, Scheme};

/// 当前的 Argon2 版本号 (0x13)
pub const ARGON2_VERSION: u8 = 0x13;

/// Argon2 变体
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Argon2Variant {
    /// Argon2i - 抵抗侧信道攻击
    Argon2i,
    /// Argon2id - 推荐的默认变体
    Argon2id,
}

impl Argon2Variant {
    /// 哈希中的方案标签
    pub fn tag(self) -> &'static str {
        match self {
            Argon2Variant::Argon2i => "argon2i",
            Argon2Variant::Argon2id => "argon2id",
        }
    }

    fn algorithm(self) -> Algorithm {
        match self {
            Argon2Variant::Argon2i => Algorithm::Argon2i,
            Argon2Variant::Argon2id => Algorithm::Argon2id,
        }
    }
}

/// Argon2 参数配置
///
/// 同时用于生成新哈希和评估已有哈希的强度。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Argon2Profile {
    /// 算法版本
    pub version: u8,
    /// 迭代次数
    pub time: u32,
    /// 内存大小 (KiB)
    pub memory: u32,
    /// 并行度
    pub threads: u8,
    /// 摘要长度（字节）
    pub key_len: u32,
    /// 盐值长度（字节）
    pub salt_len: u32,
    /// 参数解析策略
    pub parsing: ParamParsing,
}

impl Default for Argon2Profile {
    fn default() -> Self {
        Self::argon2id()
    }
}

impl Argon2Profile {
    /// 创建默认配置（argon2id 推荐值）
    pub fn new() -> Self {
        Self::default()
    }

    /// argon2id 推荐配置
    ///
    /// t=1，m=64 MiB，p=4，32 字节摘要，16 字节盐值
    pub fn argon2id() -> Self {
        Self {
            version: ARGON2_VERSION,
            time: 1,
            memory: 64 * 1024,
            threads: 4,
            key_len: 32,
            salt_len: 16,
            parsing: ParamParsing::Strict,
        }
    }

    /// argon2i 推荐配置
    ///
    /// t=3，m=32 MiB，p=4，32 字节摘要，16 字节盐值
    pub fn argon2i() -> Self {
        Self {
            time: 3,
            memory: 32 * 1024,
            ..Self::argon2id()
        }
    }

    /// 设置迭代次数
    pub fn with_time(mut self, time: u32) -> Self {
        self.time = time;
        self
    }

    /// 设置内存大小 (KiB)
    pub fn with_memory(mut self, memory: u32) -> Self {
        self.memory = memory;
        self
    }

    /// 设置并行度
    pub fn with_threads(mut self, threads: u8) -> Self {
        self.threads = threads;
        self
    }

    /// 设置摘要长度
    pub fn with_key_len(mut self, key_len: u32) -> Self {
        self.key_len = key_len;
        self
    }

    /// 设置盐值长度
    pub fn with_salt_len(mut self, salt_len: u32) -> Self {
        self.salt_len = salt_len;
        self
    }

    /// 设置参数解析策略
    pub fn with_parsing(mut self, parsing: ParamParsing) -> Self {
        self.parsing = parsing;
        self
    }

    /// 检查配置是否能被 Argon2 接受
    pub fn validate(&self) -> Result<()> {
        Version::try_from(u32::from(self.version))
            .map_err(|e| ConfigError::invalid("version", e.to_string()))?;
        Params::new(
            self.memory,
            self.time,
            u32::from(self.threads),
            Some(self.key_len as usize),
        )
        .map_err(|e| ConfigError::invalid("params", e.to_string()))?;
        if (self.salt_len as usize) < ::argon2::MIN_SALT_LEN {
            return Err(ConfigError::invalid(
                "salt_len",
                format!("must be at least {} bytes", ::argon2::MIN_SALT_LEN),
            )
            .into());
        }
        Ok(())
    }
}

/// 解码后的 Argon2 哈希
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argon2Hash {
    /// 变体
    pub variant: Argon2Variant,
    /// 算法版本
    pub version: u8,
    /// 迭代次数
    pub time: u32,
    /// 内存大小 (KiB)
    pub memory: u32,
    /// 并行度
    pub threads: u8,
    /// 盐值
    pub salt: Vec<u8>,
    /// 摘要
    pub digest: Vec<u8>,
}

impl Argon2Hash {
    /// 按格式解码哈希
    ///
    /// 缺失的参数取 `profile` 中的值；`profile.parsing` 决定无效数值的处理方式。
    pub fn decode(variant: Argon2Variant, hash: &[u8], profile: &Argon2Profile) -> Result<Self> {
        let rest =
            strip_tag(hash, variant.tag()).ok_or_else(|| Error::bad_hash("missing prefix"))?;
        let (args, rest) = cut(rest, DELIMITER).ok_or_else(|| Error::bad_hash("missing args"))?;
        let (salt, digest) =
            cut(rest, DELIMITER).ok_or_else(|| Error::bad_hash("missing salt"))?;

        let mut decoded = Self {
            variant,
            version: profile.version,
            time: profile.time,
            memory: profile.memory,
            threads: profile.threads,
            salt: SegmentEncoding::Base64.decode(salt, "salt")?,
            digest: SegmentEncoding::Base64.decode(digest, "hash")?,
        };

        let parsing = profile.parsing;
        for part in args.split(|&b| b == b',') {
            let Some((key, value)) = cut(part, b'=') else {
                continue;
            };
            match key {
                b"v" => decoded.version = parsing.parse("v", value, decoded.version)?,
                b"m" => decoded.memory = parsing.parse("m", value, decoded.memory)?,
                b"t" => decoded.time = parsing.parse("t", value, decoded.time)?,
                b"p" => decoded.threads = parsing.parse("p", value, decoded.threads)?,
                _ => {}
            }
        }

        Ok(decoded)
    }

    /// 编码为规范格式
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(96);
        push_tag(&mut out, self.variant.tag());
        out.extend_from_slice(
            format!(
                "v={},m={},t={},p={}",
                self.version, self.memory, self.time, self.threads
            )
            .as_bytes(),
        );
        out.push(DELIMITER);
        out.extend_from_slice(SegmentEncoding::Base64.encode(&self.salt).as_bytes());
        out.push(DELIMITER);
        out.extend_from_slice(SegmentEncoding::Base64.encode(&self.digest).as_bytes());
        out
    }
}

/// Argon2 方案插件
///
/// # Example
///
/// ```rust
/// use passwd::Scheme;
/// use passwd::schemes::{Argon2Profile, Argon2Scheme};
///
/// let scheme = Argon2Scheme::argon2id()
///     .with_profile(Argon2Profile::new().with_memory(1024).with_threads(1));
///
/// let hash = scheme.derive(b"my_password", None).unwrap();
/// assert!(hash.starts_with(b"$argon2id$v=19,m=1024,t=1,p=1$"));
/// assert_eq!(scheme.derive(b"my_password", Some(&hash)).unwrap(), hash);
/// ```
#[derive(Debug, Clone)]
pub struct Argon2Scheme {
    variant: Argon2Variant,
    profile: Argon2Profile,
    salts: Arc<dyn SaltSource>,
}

impl Argon2Scheme {
    /// 使用指定变体和配置创建方案
    pub fn new(variant: Argon2Variant, profile: Argon2Profile) -> Self {
        Self {
            variant,
            profile,
            salts: os_salt_source(),
        }
    }

    /// 使用推荐配置的 argon2id
    pub fn argon2id() -> Self {
        Self::new(Argon2Variant::Argon2id, Argon2Profile::argon2id())
    }

    /// 使用推荐配置的 argon2i
    pub fn argon2i() -> Self {
        Self::new(Argon2Variant::Argon2i, Argon2Profile::argon2i())
    }

    /// 替换参数配置
    pub fn with_profile(mut self, profile: Argon2Profile) -> Self {
        self.profile = profile;
        self
    }

    /// 替换盐值来源
    pub fn with_salt_source(mut self, salts: Arc<dyn SaltSource>) -> Self {
        self.salts = salts;
        self
    }

    /// 变体
    pub fn variant(&self) -> Argon2Variant {
        self.variant
    }

    /// 当前参数配置
    pub fn profile(&self) -> &Argon2Profile {
        &self.profile
    }

    /// 按本方案格式解码哈希
    pub fn decode(&self, hash: &[u8]) -> Result<Argon2Hash> {
        Argon2Hash::decode(self.variant, hash, &self.profile)
    }

    fn key(&self, password: &[u8], hash: &Argon2Hash, len: usize) -> Result<Vec<u8>> {
        let version = Version::try_from(u32::from(hash.version))
            .map_err(|e| Error::derivation(format!("argon2: {}", e)))?;
        let params = Params::new(hash.memory, hash.time, u32::from(hash.threads), Some(len))
            .map_err(|e| Error::derivation(format!("argon2: {}", e)))?;

        let mut digest = vec![0u8; len];
        Argon2::new(self.variant.algorithm(), version, params)
            .hash_password_into(password, &hash.salt, &mut digest)
            .map_err(|e| Error::derivation(format!("argon2: {}", e)))?;
        Ok(digest)
    }
}

impl Scheme for Argon2Scheme {
    fn derive(&self, password: &[u8], stored: Option<&[u8]>) -> Result<Vec<u8>> {
        let Some(stored) = stored else {
            let mut hash = Argon2Hash {
                variant: self.variant,
                version: self.profile.version,
                time: self.profile.time,
                memory: self.profile.memory,
                threads: self.profile.threads,
                salt: generate_salt(self.salts.as_ref(), self.profile.salt_len as usize)?,
                digest: Vec::new(),
            };
            hash.digest = self.key(password, &hash, self.profile.key_len as usize)?;
            return Ok(hash.encode());
        };

        let hash = self.decode(stored)?;
        let digest = self.key(password, &hash, hash.digest.len())?;
        if constant_time_compare(&digest, &hash.digest) {
            Ok(stored.to_vec())
        } else {
            Err(Error::no_match(stored))
        }
    }

    fn register(self: Arc<Self>, registry: &mut Registry) {
        registry.register(self.variant.tag(), self);
    }

    fn preference(&self) -> Option<&dyn Preference> {
        Some(self)
    }
}

impl Preference for Argon2Scheme {
    fn is_preferred(&self, stored: &[u8]) -> bool {
        let Ok(hash) = self.decode(stored) else {
            return false;
        };
        let profile = &self.profile;

        hash.version >= profile.version
            && hash.time >= profile.time
            && hash.memory >= profile.memory
            && hash.threads >= profile.threads
            && hash.digest.len() >= profile.key_len as usize
            && hash.salt.len() >= profile.salt_len as usize
    }
}
