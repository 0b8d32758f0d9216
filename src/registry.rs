//! 哈希方案注册表与分发器
//!
//! [`Registry`] 保存按标签注册的方案、默认方案和可选的兜底方案，
//! 并把每次调用路由到对应的方案。
//!
//! ## 初始化顺序约定
//!
//! - 第一个注册的方案成为默认方案，除非之后调用 [`Registry::set_default`]
//! - 同一标签重复注册时后者覆盖前者
//! - 注册表构建完成后只读使用；修改需要 `&mut`，共享后（例如放入 `Arc`）
//!   便不能再修改，所以并发调用无需加锁
//!
//! ## 标签解析
//!
//! - 不以 `$` 开头的哈希没有标签，只能由兜底方案处理（旧的无标签格式）
//! - `$<tag>$...`：第一个与第二个 `$` 之间的部分为标签，大小写敏感
//! - 只有一个 `$` 时无法解析标签，同样交给兜底方案
//!
//! ## 示例
//!
//! ```rust
//! use passwd::Registry;
//! use passwd::schemes::{Argon2Profile, Argon2Scheme, Md5Scheme};
//!
//! let profile = Argon2Profile::new().with_memory(1024).with_threads(1);
//! let registry = Registry::new()
//!     .with(Argon2Scheme::argon2id().with_profile(profile)) // 第一个注册的为默认方案
//!     .with(Md5Scheme);
//!
//! let legacy = b"$1$81ed91e1131a3a5a50d8a68e8ef85fa0";
//! registry.authenticate(b"my_pass", Some(legacy)).unwrap();
//!
//! // 旧哈希验证通过后升级到默认方案
//! if !registry.is_preferred(legacy) {
//!     let upgraded = registry.authenticate(b"my_pass", None).unwrap();
//!     assert!(upgraded.starts_with(b"$argon2id$v=19,m=1024,t=1,p=1$"));
//! }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;

use crate::encoding::{DELIMITER, cut};
use crate::error::{Error, Result};
use crate::scheme::Scheme;

/// 从哈希中解析出的标签
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag<'a> {
    /// 不以 `$` 开头，没有标签
    Untagged,
    /// 以 `$` 开头但缺少第二个分隔符
    Malformed,
    /// 两个分隔符之间的标签
    Named(&'a [u8]),
}

impl<'a> Tag<'a> {
    /// 解析哈希的标签
    ///
    /// # Example
    ///
    /// ```rust
    /// use passwd::registry::Tag;
    ///
    /// assert_eq!(Tag::parse(b"$s2$16384$8$1$..."), Tag::Named(b"s2"));
    /// assert_eq!(Tag::parse(b"16384$8$1$..."), Tag::Untagged);
    /// assert_eq!(Tag::parse(b"$argon2id"), Tag::Malformed);
    /// ```
    pub fn parse(hash: &'a [u8]) -> Self {
        let Some(rest) = hash.strip_prefix(&[DELIMITER][..]) else {
            return Tag::Untagged;
        };
        match cut(rest, DELIMITER) {
            Some((tag, _)) => Tag::Named(tag),
            None => Tag::Malformed,
        }
    }
}

/// 一次调用的路由结果
#[derive(Debug)]
enum Route<'r> {
    /// 标签对应已注册的方案
    Scheme(&'r Arc<dyn Scheme>),
    /// 标签无法解析，交给兜底方案
    Fallthrough(&'r Arc<dyn Scheme>),
    /// 标签无法解析且没有兜底方案
    Unhandled(Option<String>),
}

/// 验证并按需升级的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upgrade {
    /// 验证通过的原哈希
    pub verified: Vec<u8>,
    /// 原哈希不满足当前默认方案时，使用默认方案重新生成的哈希
    pub replacement: Option<Vec<u8>>,
}

impl Upgrade {
    /// 是否需要持久化新的哈希
    pub fn needs_persist(&self) -> bool {
        self.replacement.is_some()
    }
}

/// 哈希方案注册表
#[derive(Debug, Default)]
pub struct Registry {
    /// 标签 -> 方案
    schemes: HashMap<String, Arc<dyn Scheme>>,
    /// 方案 -> 首次注册的标签
    tags: HashMap<usize, String>,
    /// 没有存储哈希时用于生成的方案
    default: Option<Arc<dyn Scheme>>,
    /// 标签无法解析时的方案
    fallthrough: Option<Arc<dyn Scheme>>,
}

impl Registry {
    /// 创建空的注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 包含所有已启用方案的注册表
    ///
    /// 注册顺序为 argon2id、argon2i、s1、s2、MD5、bcrypt；argon2id 为默认方案，
    /// s1 为兜底方案（未启用对应 feature 时跳过）。
    pub fn recommended() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();

        #[cfg(feature = "argon2")]
        {
            use crate::schemes::Argon2Scheme;
            registry.apply(Arc::new(Argon2Scheme::argon2id()));
            registry.apply(Arc::new(Argon2Scheme::argon2i()));
        }

        #[cfg(feature = "scrypt")]
        {
            use crate::schemes::ScryptScheme;
            registry.apply(Arc::new(ScryptScheme::s1()));
            registry.apply(Arc::new(ScryptScheme::s2()));
        }

        #[cfg(feature = "unix")]
        {
            use crate::schemes::{BcryptScheme, Md5Scheme};
            registry.apply(Arc::new(Md5Scheme));
            registry.apply(Arc::new(BcryptScheme::default()));
        }

        registry
    }

    /// 应用一个方案的自注册，返回 self 以便链式调用
    pub fn with<S: Scheme + 'static>(mut self, scheme: S) -> Self {
        self.apply(Arc::new(scheme));
        self
    }

    /// 应用一个方案的自注册
    pub fn apply(&mut self, scheme: Arc<dyn Scheme>) {
        scheme.register(self);
    }

    /// 按顺序应用多个方案
    pub fn options(&mut self, schemes: impl IntoIterator<Item = Arc<dyn Scheme>>) {
        for scheme in schemes {
            self.apply(scheme);
        }
    }

    /// 以指定标签注册方案
    ///
    /// 尚未设置默认方案时，该方案成为默认方案。重复的标签直接覆盖。
    pub fn register(&mut self, tag: impl Into<String>, scheme: Arc<dyn Scheme>) {
        let tag = tag.into();

        if let Some(previous) = self.schemes.insert(tag.clone(), Arc::clone(&scheme)) {
            let key = identity(&previous);
            if key != identity(&scheme) && self.tags.get(&key) == Some(&tag) {
                // 改用该方案剩余的别名中最小的一个
                match self
                    .schemes
                    .iter()
                    .filter(|(_, s)| identity(s) == key)
                    .map(|(t, _)| t)
                    .min()
                {
                    Some(alias) => {
                        self.tags.insert(key, alias.clone());
                    }
                    None => {
                        self.tags.remove(&key);
                    }
                }
            }
        }
        self.tags.entry(identity(&scheme)).or_insert(tag);

        if self.default.is_none() {
            self.default = Some(scheme);
        }
    }

    /// 设置默认方案
    pub fn set_default(&mut self, scheme: Arc<dyn Scheme>) {
        self.default = Some(scheme);
    }

    /// 设置兜底方案
    pub fn set_fallthrough(&mut self, scheme: Arc<dyn Scheme>) {
        self.fallthrough = Some(scheme);
    }

    /// 按标签查找方案
    pub fn get(&self, tag: &str) -> Option<&Arc<dyn Scheme>> {
        self.schemes.get(tag)
    }

    /// 方案首次注册时使用的标签
    ///
    /// 该标签被其他方案覆盖后，返回方案仍在使用的别名中按字典序最小的一个；
    /// 没有剩余标签时返回 `None`。
    pub fn tag_of(&self, scheme: &Arc<dyn Scheme>) -> Option<&str> {
        self.tags.get(&identity(scheme)).map(String::as_str)
    }

    /// 默认方案的标签
    pub fn default_tag(&self) -> Option<&str> {
        self.default.as_ref().and_then(|s| self.tag_of(s))
    }

    /// 兜底方案的标签
    pub fn fallthrough_tag(&self) -> Option<&str> {
        self.fallthrough.as_ref().and_then(|s| self.tag_of(s))
    }

    /// 生成或验证密码哈希
    ///
    /// - `stored` 为 `None` 或空：使用默认方案生成新哈希
    /// - 否则按标签路由到对应方案验证，成功时原样返回 `stored`
    ///
    /// # Errors
    ///
    /// - `NoHandler`: 没有默认方案，或标签无法解析且没有兜底方案
    /// - `BadHash` / `NoMatch` / `Derivation`: 来自所选方案
    ///
    /// # Example
    ///
    /// ```rust
    /// use passwd::Registry;
    /// use passwd::schemes::Md5Scheme;
    ///
    /// let registry = Registry::new().with(Md5Scheme);
    /// let hash = registry.authenticate(b"passwd", None).unwrap();
    /// assert_eq!(hash, b"$1$76a2173be6393254e72ffa4d6df1030a");
    ///
    /// assert!(registry.authenticate(b"passwd", Some(&hash)).is_ok());
    /// assert!(registry.authenticate(b"wrong", Some(&hash)).unwrap_err().is_no_match());
    /// ```
    pub fn authenticate(&self, password: &[u8], stored: Option<&[u8]>) -> Result<Vec<u8>> {
        let Some(stored) = stored.filter(|hash| !hash.is_empty()) else {
            let scheme = self
                .default
                .as_ref()
                .ok_or(Error::NoHandler { tag: None })?;
            trace!(scheme = self.tag_of(scheme), "generating with default scheme");
            return scheme.derive(password, None);
        };

        match self.route(stored) {
            Route::Scheme(scheme) => {
                trace!(scheme = self.tag_of(scheme), "verifying with registered scheme");
                scheme.derive(password, Some(stored))
            }
            Route::Fallthrough(scheme) => {
                trace!(scheme = self.tag_of(scheme), "verifying with fallthrough scheme");
                scheme.derive(password, Some(stored))
            }
            Route::Unhandled(tag) => {
                trace!(tag = tag.as_deref(), "no scheme for stored hash");
                Err(Error::NoHandler { tag })
            }
        }
    }

    /// 存储的哈希是否满足当前默认方案
    ///
    /// 只有当哈希解析到默认方案，并且该方案的强度评估（若实现）也通过时才返回
    /// true。带有未注册或无法解析标签的哈希返回 false；兜底方案只用于无标签的哈希。
    pub fn is_preferred(&self, stored: &[u8]) -> bool {
        let Some(default) = &self.default else {
            return false;
        };

        let scheme = match Tag::parse(stored) {
            Tag::Untagged if !stored.is_empty() => self.fallthrough.as_ref(),
            Tag::Named(tag) => self.lookup(tag),
            _ => None,
        };

        match scheme {
            Some(scheme) if identity(scheme) == identity(default) => scheme
                .preference()
                .is_none_or(|preference| preference.is_preferred(stored)),
            _ => false,
        }
    }

    /// 验证哈希，并在其不满足默认方案时生成替换哈希
    ///
    /// # Errors
    ///
    /// 与 [`Registry::authenticate`] 相同；空哈希返回 `BadHash`。
    pub fn upgrade(&self, password: &[u8], stored: &[u8]) -> Result<Upgrade> {
        if stored.is_empty() {
            return Err(Error::bad_hash("empty hash"));
        }

        let verified = self.authenticate(password, Some(stored))?;
        let replacement = if self.is_preferred(&verified) {
            None
        } else {
            Some(self.authenticate(password, None)?)
        };

        Ok(Upgrade {
            verified,
            replacement,
        })
    }

    fn lookup(&self, tag: &[u8]) -> Option<&Arc<dyn Scheme>> {
        std::str::from_utf8(tag)
            .ok()
            .and_then(|tag| self.schemes.get(tag))
    }

    fn route(&self, stored: &[u8]) -> Route<'_> {
        let tag = match Tag::parse(stored) {
            Tag::Named(tag) => match self.lookup(tag) {
                Some(scheme) => return Route::Scheme(scheme),
                None => Some(String::from_utf8_lossy(tag).into_owned()),
            },
            Tag::Untagged | Tag::Malformed => None,
        };

        match &self.fallthrough {
            Some(scheme) => Route::Fallthrough(scheme),
            None => Route::Unhandled(tag),
        }
    }
}

/// 方案实例的身份，用于反向查找和默认方案比较
fn identity(scheme: &Arc<dyn Scheme>) -> usize {
    Arc::as_ptr(scheme).cast::<()>() as usize
}
