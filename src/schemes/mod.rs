//! 内置哈希方案
//!
//! ## 支持的方案
//!
//! | 标签 | 方案 | feature |
//! |---|---|---|
//! | `argon2id` / `argon2i` | [`Argon2Scheme`] | `argon2` |
//! | `s1`（兜底）/ `s2` | [`ScryptScheme`] | `scrypt` |
//! | `1` | [`Md5Scheme`] | `unix` |
//! | `2a` / `2b` / `2y` | [`BcryptScheme`] | `unix` |

#[cfg(feature = "argon2")]
mod argon2;
#[cfg(feature = "scrypt")]
mod scrypt;
#[cfg(feature = "unix")]
mod unix;

#[cfg(feature = "argon2")]
pub use self::argon2::{ARGON2_VERSION, Argon2Hash, Argon2Profile, Argon2Scheme, Argon2Variant};
#[cfg(feature = "scrypt")]
pub use self::scrypt::{ScryptFormat, ScryptHash, ScryptProfile, ScryptScheme};
#[cfg(feature = "unix")]
pub use self::unix::{
    BCRYPT_DEFAULT_COST, BCRYPT_TAGS, BcryptProfile, BcryptScheme, MD5_TAG, Md5Scheme,
};

// 编译时检查：至少需要启用一个内置方案
#[cfg(not(any(feature = "argon2", feature = "scrypt", feature = "unix")))]
compile_error!(
    "At least one password hashing scheme (argon2, scrypt, or unix) must be enabled. Enable one of the scheme features."
);
