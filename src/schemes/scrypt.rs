//! scrypt 方案
//!
//! 两种按位置排列参数的格式：
//!
//! - `s1`：`<N>$<R>$<P>$<hex-salt>$<hex-digest>`，不带标签，作为无标签哈希的兜底方案
//! - `s2`：`$s2$<N>$<R>$<P>$<b64-salt>$<b64-digest>`，无填充标准 base64
//!
//! `N` 以完整值（而不是 log2）存储。

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::encoding::{DELIMITER, ParamParsing, SegmentEncoding, cut, push_tag, strip_tag};
use crate::error::{ConfigError, Error, Result};
use crate::random::{SaltSource, constant_time_compare, generate_salt, os_salt_source};
use crate::registry::Registry;
use crate::scheme::{Preference, Scheme};

/// scrypt 哈希格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScryptFormat {
    /// 无标签，十六进制编码
    S1,
    /// `$s2$` 标签，base64 编码
    S2,
}

impl ScryptFormat {
    /// 方案标签
    pub fn tag(self) -> &'static str {
        match self {
            ScryptFormat::S1 => "s1",
            ScryptFormat::S2 => "s2",
        }
    }

    /// 编码时是否写入标签
    pub fn is_tagged(self) -> bool {
        matches!(self, ScryptFormat::S2)
    }

    fn encoding(self) -> SegmentEncoding {
        match self {
            ScryptFormat::S1 => SegmentEncoding::Hex,
            ScryptFormat::S2 => SegmentEncoding::Base64,
        }
    }
}

/// scrypt 参数配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScryptProfile {
    /// CPU/内存开销参数 N（2 的幂）
    pub n: u64,
    /// 块大小参数 r
    pub r: u32,
    /// 并行参数 p
    pub p: u32,
    /// 盐值长度（字节）
    pub salt_len: usize,
    /// 派生密钥长度（字节）
    pub key_len: usize,
    /// 参数解析策略
    pub parsing: ParamParsing,
}

impl Default for ScryptProfile {
    fn default() -> Self {
        Self {
            n: 16384,
            r: 8,
            p: 1,
            salt_len: 16,
            key_len: 32,
            parsing: ParamParsing::Strict,
        }
    }
}

impl ScryptProfile {
    /// 创建默认配置（N=16384，r=8，p=1）
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置 N
    pub fn with_n(mut self, n: u64) -> Self {
        self.n = n;
        self
    }

    /// 设置 r
    pub fn with_r(mut self, r: u32) -> Self {
        self.r = r;
        self
    }

    /// 设置 p
    pub fn with_p(mut self, p: u32) -> Self {
        self.p = p;
        self
    }

    /// 设置盐值长度
    pub fn with_salt_len(mut self, salt_len: usize) -> Self {
        self.salt_len = salt_len;
        self
    }

    /// 设置派生密钥长度
    pub fn with_key_len(mut self, key_len: usize) -> Self {
        self.key_len = key_len;
        self
    }

    /// 设置参数解析策略
    pub fn with_parsing(mut self, parsing: ParamParsing) -> Self {
        self.parsing = parsing;
        self
    }

    /// 检查配置是否能被 scrypt 接受
    pub fn validate(&self) -> Result<()> {
        let log_n = log2(self.n).map_err(|e| ConfigError::invalid("n", e))?;
        ::scrypt::Params::new(log_n, self.r, self.p, ::scrypt::Params::RECOMMENDED_LEN)
            .map_err(|e| ConfigError::invalid("params", e.to_string()))?;
        if self.key_len == 0 {
            return Err(ConfigError::invalid("key_len", "must not be zero").into());
        }
        if self.salt_len == 0 {
            return Err(ConfigError::invalid("salt_len", "must not be zero").into());
        }
        Ok(())
    }
}

fn log2(n: u64) -> std::result::Result<u8, String> {
    if n < 2 || !n.is_power_of_two() {
        return Err(format!("N must be a power of two greater than 1, got {}", n));
    }
    Ok(n.trailing_zeros() as u8)
}

/// 解码后的 scrypt 哈希
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScryptHash {
    /// 格式
    pub format: ScryptFormat,
    /// N
    pub n: u64,
    /// r
    pub r: u32,
    /// p
    pub p: u32,
    /// 盐值
    pub salt: Vec<u8>,
    /// 派生密钥
    pub digest: Vec<u8>,
}

impl ScryptHash {
    /// 按格式解码哈希
    ///
    /// `s1` 接受可选的 `$s1$` 前缀，`s2` 必须带有 `$s2$` 前缀。
    pub fn decode(format: ScryptFormat, hash: &[u8], profile: &ScryptProfile) -> Result<Self> {
        let rest = match strip_tag(hash, format.tag()) {
            Some(rest) => rest,
            None if !format.is_tagged() => hash,
            None => return Err(Error::bad_hash("missing prefix")),
        };

        let parsing = profile.parsing;
        let (n, rest) = cut(rest, DELIMITER).ok_or_else(|| Error::bad_hash("missing args: N"))?;
        let n = parsing.parse("N", n, profile.n)?;
        let (r, rest) = cut(rest, DELIMITER).ok_or_else(|| Error::bad_hash("missing args: R"))?;
        let r = parsing.parse("R", r, profile.r)?;
        let (p, rest) = cut(rest, DELIMITER).ok_or_else(|| Error::bad_hash("missing args: P"))?;
        let p = parsing.parse("P", p, profile.p)?;
        let (salt, digest) =
            cut(rest, DELIMITER).ok_or_else(|| Error::bad_hash("missing args: salt"))?;

        let encoding = format.encoding();
        Ok(Self {
            format,
            n,
            r,
            p,
            salt: encoding.decode(salt, "salt")?,
            digest: encoding.decode(digest, "hash")?,
        })
    }

    /// 编码为规范格式
    pub fn encode(&self) -> Vec<u8> {
        let encoding = self.format.encoding();
        let mut out = Vec::with_capacity(128);
        if self.format.is_tagged() {
            push_tag(&mut out, self.format.tag());
        }
        out.extend_from_slice(format!("{}${}${}", self.n, self.r, self.p).as_bytes());
        out.push(DELIMITER);
        out.extend_from_slice(encoding.encode(&self.salt).as_bytes());
        out.push(DELIMITER);
        out.extend_from_slice(encoding.encode(&self.digest).as_bytes());
        out
    }
}

/// scrypt 方案插件
///
/// `s1` 注册时同时声明为兜底方案。
#[derive(Debug, Clone)]
pub struct ScryptScheme {
    format: ScryptFormat,
    profile: ScryptProfile,
    salts: Arc<dyn SaltSource>,
}

impl ScryptScheme {
    /// 使用指定格式和配置创建方案
    pub fn new(format: ScryptFormat, profile: ScryptProfile) -> Self {
        Self {
            format,
            profile,
            salts: os_salt_source(),
        }
    }

    /// 使用默认配置的 `s1`
    pub fn s1() -> Self {
        Self::new(ScryptFormat::S1, ScryptProfile::default())
    }

    /// 使用默认配置的 `s2`
    pub fn s2() -> Self {
        Self::new(ScryptFormat::S2, ScryptProfile::default())
    }

    /// 替换参数配置
    pub fn with_profile(mut self, profile: ScryptProfile) -> Self {
        self.profile = profile;
        self
    }

    /// 替换盐值来源
    pub fn with_salt_source(mut self, salts: Arc<dyn SaltSource>) -> Self {
        self.salts = salts;
        self
    }

    /// 格式
    pub fn format(&self) -> ScryptFormat {
        self.format
    }

    /// 当前参数配置
    pub fn profile(&self) -> &ScryptProfile {
        &self.profile
    }

    /// 按本方案格式解码哈希
    pub fn decode(&self, hash: &[u8]) -> Result<ScryptHash> {
        ScryptHash::decode(self.format, hash, &self.profile)
    }

    fn key(&self, password: &[u8], hash: &ScryptHash, len: usize) -> Result<Vec<u8>> {
        let log_n = log2(hash.n).map_err(|e| Error::derivation(format!("scrypt: {}", e)))?;
        // Params 的长度字段只用于 PHC 输出，实际长度由缓冲区决定
        let params = ::scrypt::Params::new(log_n, hash.r, hash.p, ::scrypt::Params::RECOMMENDED_LEN)
            .map_err(|e| Error::derivation(format!("scrypt: {}", e)))?;

        let mut digest = vec![0u8; len];
        ::scrypt::scrypt(password, &hash.salt, &params, &mut digest)
            .map_err(|e| Error::derivation(format!("scrypt: {}", e)))?;
        Ok(digest)
    }
}

impl Scheme for ScryptScheme {
    fn derive(&self, password: &[u8], stored: Option<&[u8]>) -> Result<Vec<u8>> {
        let Some(stored) = stored else {
            let mut hash = ScryptHash {
                format: self.format,
                n: self.profile.n,
                r: self.profile.r,
                p: self.profile.p,
                salt: generate_salt(self.salts.as_ref(), self.profile.salt_len)?,
                digest: Vec::new(),
            };
            hash.digest = self.key(password, &hash, self.profile.key_len)?;
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
        let format = self.format;
        registry.register(format.tag(), self.clone());
        if format == ScryptFormat::S1 {
            registry.set_fallthrough(self);
        }
    }

    fn preference(&self) -> Option<&dyn Preference> {
        Some(self)
    }
}

impl Preference for ScryptScheme {
    fn is_preferred(&self, stored: &[u8]) -> bool {
        let Ok(hash) = self.decode(stored) else {
            return false;
        };
        let profile = &self.profile;

        hash.n >= profile.n
            && hash.r >= profile.r
            && hash.p >= profile.p
            && hash.salt.len() >= profile.salt_len
            && hash.digest.len() >= profile.key_len
    }
}
