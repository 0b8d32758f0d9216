//! Unix 风格的旧格式方案
//!
//! - MD5：`$1$<hex-digest>`，直接对密码做一次 MD5，没有盐值和参数，仅用于兼容旧数据
//! - bcrypt：`$2a$<cost>$<salt+digest>`，格式完全由 bcrypt 自身定义，本方案只做适配

use std::sync::Arc;

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

use crate::encoding::{DELIMITER, SegmentEncoding, cut, strip_tag};
use crate::error::{ConfigError, Error, Result};
use crate::random::{SaltSource, constant_time_compare, generate_salt, os_salt_source};
use crate::registry::Registry;
use crate::scheme::{Preference, Scheme};

// ============================================================================
// MD5
// ============================================================================

/// MD5 方案的标签
pub const MD5_TAG: &str = "1";

/// MD5 方案插件
///
/// 不实现强度评估。
///
/// # Example
///
/// ```rust
/// use passwd::Scheme;
/// use passwd::schemes::Md5Scheme;
///
/// let hash = Md5Scheme.derive(b"passwd", None).unwrap();
/// assert_eq!(hash, b"$1$76a2173be6393254e72ffa4d6df1030a");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Md5Scheme;

impl Md5Scheme {
    fn digest(password: &[u8]) -> Vec<u8> {
        Md5::digest(password).to_vec()
    }
}

impl Scheme for Md5Scheme {
    fn derive(&self, password: &[u8], stored: Option<&[u8]>) -> Result<Vec<u8>> {
        let digest = Self::digest(password);

        let Some(stored) = stored else {
            let mut out = format!("${}$", MD5_TAG).into_bytes();
            out.extend_from_slice(SegmentEncoding::Hex.encode(&digest).as_bytes());
            return Ok(out);
        };

        let hex = strip_tag(stored, MD5_TAG).ok_or_else(|| Error::bad_hash("missing prefix"))?;
        let expected = SegmentEncoding::Hex.decode(hex, "hash")?;
        if expected.len() != digest.len() {
            return Err(Error::bad_hash("wrong digest length"));
        }

        // 比较编码后的文本，只接受规范的小写形式
        let encoded = SegmentEncoding::Hex.encode(&digest);
        if constant_time_compare(encoded.as_bytes(), hex) {
            Ok(stored.to_vec())
        } else {
            Err(Error::no_match(stored))
        }
    }

    fn register(self: Arc<Self>, registry: &mut Registry) {
        registry.register(MD5_TAG, self);
    }
}

// ============================================================================
// bcrypt
// ============================================================================

/// bcrypt 方案注册的标签，第一个为生成时使用的版本
pub const BCRYPT_TAGS: [&str; 3] = ["2a", "2b", "2y"];

/// bcrypt 默认 cost
pub const BCRYPT_DEFAULT_COST: u32 = 10;

/// bcrypt 盐值长度（字节），由算法固定
const BCRYPT_SALT_LEN: usize = 16;

const BCRYPT_COST_RANGE: std::ops::RangeInclusive<u32> = 4..=31;

/// bcrypt 参数配置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BcryptProfile {
    /// cost 参数 (4-31)
    pub cost: u32,
}

impl Default for BcryptProfile {
    fn default() -> Self {
        Self {
            cost: BCRYPT_DEFAULT_COST,
        }
    }
}

impl BcryptProfile {
    /// 检查 cost 是否在 bcrypt 接受的范围内
    ///
    /// 从配置文件加载的 profile 应在传给 [`BcryptScheme::new`] 前校验。
    pub fn validate(&self) -> Result<()> {
        if !BCRYPT_COST_RANGE.contains(&self.cost) {
            return Err(ConfigError::invalid(
                "cost",
                format!("must be between 4 and 31, got {}", self.cost),
            )
            .into());
        }
        Ok(())
    }
}

/// bcrypt 方案插件
///
/// 注册为 `2a`，同时接受 `2b` / `2y` 前缀的哈希；生成的哈希使用 `$2a$` 前缀。
#[derive(Debug, Clone)]
pub struct BcryptScheme {
    profile: BcryptProfile,
    salts: Arc<dyn SaltSource>,
}

impl Default for BcryptScheme {
    fn default() -> Self {
        Self::new(BcryptProfile::default())
    }
}

impl BcryptScheme {
    /// 使用指定配置创建方案
    ///
    /// # Panics
    ///
    /// 如果 cost 不在 4-31 范围内会 panic，可先调用 [`BcryptProfile::validate`]
    pub fn new(profile: BcryptProfile) -> Self {
        Self {
            profile: BcryptProfile::default(),
            salts: os_salt_source(),
        }
        .with_cost(profile.cost)
    }

    /// 设置 cost 参数
    ///
    /// # Panics
    ///
    /// 如果 cost 不在 4-31 范围内会 panic
    pub fn with_cost(mut self, cost: u32) -> Self {
        assert!(
            BCRYPT_COST_RANGE.contains(&cost),
            "bcrypt cost must be between 4 and 31"
        );
        self.profile.cost = cost;
        self
    }

    /// 替换盐值来源
    pub fn with_salt_source(mut self, salts: Arc<dyn SaltSource>) -> Self {
        self.salts = salts;
        self
    }

    /// 当前 cost
    pub fn cost(&self) -> u32 {
        self.profile.cost
    }

    /// 从哈希中读取 cost
    fn parse_cost(stored: &[u8]) -> Option<u32> {
        let rest = BCRYPT_TAGS.iter().find_map(|tag| strip_tag(stored, tag))?;
        let (cost, _) = cut(rest, DELIMITER)?;
        std::str::from_utf8(cost).ok()?.parse().ok()
    }
}

fn map_bcrypt_error(err: bcrypt::BcryptError) -> Error {
    use bcrypt::BcryptError;
    match err {
        BcryptError::InvalidCost(_)
        | BcryptError::InvalidPrefix(_)
        | BcryptError::InvalidHash(_)
        | BcryptError::InvalidBase64(_) => Error::bad_hash(format!("bcrypt: {}", err)),
        other => Error::derivation(format!("bcrypt: {}", other)),
    }
}

impl Scheme for BcryptScheme {
    fn derive(&self, password: &[u8], stored: Option<&[u8]>) -> Result<Vec<u8>> {
        let Some(stored) = stored else {
            let mut salt = [0u8; BCRYPT_SALT_LEN];
            salt.copy_from_slice(&generate_salt(self.salts.as_ref(), BCRYPT_SALT_LEN)?);
            let parts =
                bcrypt::hash_with_salt(password, self.profile.cost, salt).map_err(map_bcrypt_error)?;
            return Ok(parts.format_for_version(bcrypt::Version::TwoA).into_bytes());
        };

        let hash = std::str::from_utf8(stored).map_err(|_| Error::bad_hash("not valid UTF-8"))?;
        match bcrypt::verify(password, hash) {
            Ok(true) => Ok(stored.to_vec()),
            Ok(false) => Err(Error::no_match(stored)),
            Err(e) => Err(map_bcrypt_error(e)),
        }
    }

    fn register(self: Arc<Self>, registry: &mut Registry) {
        for tag in BCRYPT_TAGS {
            registry.register(tag, self.clone());
        }
    }

    fn preference(&self) -> Option<&dyn Preference> {
        Some(self)
    }
}

impl Preference for BcryptScheme {
    fn is_preferred(&self, stored: &[u8]) -> bool {
        Self::parse_cost(stored).is_some_and(|cost| cost >= self.profile.cost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MD5_PASSWD: &[u8] = b"$1$76a2173be6393254e72ffa4d6df1030a";
    const BCRYPT_PASSWD: &[u8] = b"$2a$10$GkJwB.nOaaeAvRGgyl2TI.kruM8e.iIo.OozgdslegpNlC/vIFKRq";

    #[test]
    fn test_md5_known_answer() {
        assert_eq!(Md5Scheme.derive(b"passwd", None).unwrap(), MD5_PASSWD);
        assert_eq!(
            Md5Scheme.derive(b"my_pass", None).unwrap(),
            b"$1$81ed91e1131a3a5a50d8a68e8ef85fa0"
        );
    }

    #[test]
    fn test_md5_verify() {
        assert_eq!(Md5Scheme.derive(b"passwd", Some(MD5_PASSWD)).unwrap(), MD5_PASSWD);

        let err = Md5Scheme.derive(b"wrong", Some(MD5_PASSWD)).unwrap_err();
        assert!(err.is_no_match());
        assert_eq!(err.stored_hash(), Some(MD5_PASSWD));
    }

    #[test]
    fn test_md5_uppercase_is_not_canonical() {
        let upper: &[u8] = b"$1$76A2173BE6393254E72FFA4D6DF1030A";
        let err = Md5Scheme.derive(b"passwd", Some(upper)).unwrap_err();
        assert!(err.is_no_match());
        assert_eq!(err.stored_hash(), Some(upper));
    }

    #[test]
    fn test_md5_bad_hash() {
        let cases: [&[u8]; 4] = [
            b"76a2173be6393254e72ffa4d6df1030a",
            b"$1$not-hex",
            b"$1$76a2173b",
            b"$1$salt$76a2173be6393254e72ffa4d6df1030a",
        ];
        for case in cases {
            let err = Md5Scheme.derive(b"passwd", Some(case)).unwrap_err();
            assert!(err.is_bad_hash(), "{:?}", String::from_utf8_lossy(case));
        }
    }

    #[test]
    fn test_bcrypt_known_answer() {
        let scheme = BcryptScheme::default();
        assert_eq!(scheme.derive(b"passwd", Some(BCRYPT_PASSWD)).unwrap(), BCRYPT_PASSWD);
        assert!(scheme.derive(b"wrong", Some(BCRYPT_PASSWD)).unwrap_err().is_no_match());
    }

    #[test]
    fn test_bcrypt_generate_and_verify() {
        let scheme = BcryptScheme::default().with_cost(4); // 使用低 cost 加快测试
        let hash = scheme.derive(b"passwd", None).unwrap();

        assert!(hash.starts_with(b"$2a$04$"));
        assert_eq!(hash.len(), 60);
        assert_eq!(scheme.derive(b"passwd", Some(&hash)).unwrap(), hash);
        assert!(scheme.derive(b"wrong", Some(&hash)).unwrap_err().is_no_match());
    }

    #[test]
    fn test_bcrypt_bad_hash() {
        let scheme = BcryptScheme::default();
        assert!(scheme.derive(b"passwd", Some(b"$2a$10$short")).unwrap_err().is_bad_hash());
        assert!(scheme.derive(b"passwd", Some(b"not bcrypt")).unwrap_err().is_bad_hash());
        assert!(scheme.derive(b"passwd", Some(&[0xff, 0xfe])).unwrap_err().is_bad_hash());
    }

    #[test]
    fn test_bcrypt_is_preferred() {
        let scheme = BcryptScheme::default();
        assert!(scheme.is_preferred(BCRYPT_PASSWD));
        assert!(!scheme.clone().with_cost(12).is_preferred(BCRYPT_PASSWD));
        assert!(scheme.is_preferred(b"$2b$11$GkJwB.nOaaeAvRGgyl2TI.kruM8e.iIo.OozgdslegpNlC/vIFKRq"));
        assert!(!scheme.is_preferred(b"$2a$xx$GkJwB"));
        assert!(!scheme.is_preferred(MD5_PASSWD));
    }

    #[test]
    fn test_bcrypt_profile_validate() {
        assert!(BcryptProfile::default().validate().is_ok());
        assert!(BcryptProfile { cost: 4 }.validate().is_ok());
        assert!(BcryptProfile { cost: 31 }.validate().is_ok());

        let err = BcryptProfile { cost: 3 }.validate().unwrap_err();
        assert_eq!(
            err,
            Error::Config(ConfigError::invalid("cost", "must be between 4 and 31, got 3"))
        );
        assert!(BcryptProfile { cost: 32 }.validate().is_err());
    }

    #[test]
    #[should_panic(expected = "bcrypt cost must be between 4 and 31")]
    fn test_invalid_bcrypt_cost_low() {
        BcryptScheme::default().with_cost(3);
    }

    #[test]
    #[should_panic(expected = "bcrypt cost must be between 4 and 31")]
    fn test_invalid_bcrypt_cost_high() {
        BcryptScheme::new(BcryptProfile { cost: 32 });
    }

    #[test]
    fn test_register_tags() {
        let registry = Registry::new().with(Md5Scheme).with(BcryptScheme::default());
        assert_eq!(registry.default_tag(), Some(MD5_TAG));
        for tag in BCRYPT_TAGS {
            assert!(registry.get(tag).is_some());
        }
        let bcrypt = registry.get("2y").unwrap().clone();
        assert_eq!(registry.tag_of(&bcrypt), Some("2a"));
    }
}
