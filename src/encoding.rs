//! 哈希字符串的共享解析与编码工具
//!
//! 所有方案的格式都是以 `$` 分隔的字节串，这里提供分段、数字参数解析
//! 以及 base64 / hex 编解码的公共实现。

use std::str::FromStr;

use base64::{Engine, engine::general_purpose::STANDARD_NO_PAD};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// 哈希字符串的分隔符
pub const DELIMITER: u8 = b'$';

/// 数字参数解析策略
///
/// 决定已识别的参数键携带无法解析的数值时的行为。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamParsing {
    /// 整个解码失败并返回 `BadHash`
    #[default]
    Strict,
    /// 保留方案当前配置的值
    Lenient,
}

impl ParamParsing {
    /// 按策略解析一个数字参数
    ///
    /// `current` 为解析失败且策略为 `Lenient` 时保留的值。
    pub fn parse<T: FromStr>(self, name: &str, raw: &[u8], current: T) -> Result<T> {
        match std::str::from_utf8(raw).ok().and_then(|s| s.parse().ok()) {
            Some(value) => Ok(value),
            None => match self {
                ParamParsing::Strict => Err(Error::bad_hash(format!("invalid value for {}", name))),
                ParamParsing::Lenient => Ok(current),
            },
        }
    }
}

/// 在第一个分隔符处切分
///
/// 没有分隔符时返回 `None`。
pub fn cut(input: &[u8], sep: u8) -> Option<(&[u8], &[u8])> {
    let pos = input.iter().position(|&b| b == sep)?;
    Some((&input[..pos], &input[pos + 1..]))
}

/// 去掉 `$<tag>$` 前缀，不存在时返回 `None`
pub fn strip_tag<'a>(input: &'a [u8], tag: &str) -> Option<&'a [u8]> {
    let rest = input.strip_prefix(&[DELIMITER][..])?;
    let rest = rest.strip_prefix(tag.as_bytes())?;
    rest.strip_prefix(&[DELIMITER][..])
}

/// 写入 `$<tag>$` 前缀
pub fn push_tag(out: &mut Vec<u8>, tag: &str) {
    out.push(DELIMITER);
    out.extend_from_slice(tag.as_bytes());
    out.push(DELIMITER);
}

/// 字节段的编码方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentEncoding {
    /// 无填充的标准 base64
    Base64,
    /// 小写十六进制
    Hex,
}

impl SegmentEncoding {
    /// 编码字节段
    pub fn encode(self, bytes: &[u8]) -> String {
        match self {
            SegmentEncoding::Base64 => STANDARD_NO_PAD.encode(bytes),
            SegmentEncoding::Hex => hex::encode(bytes),
        }
    }

    /// 解码字节段，`part` 用于错误信息
    pub fn decode(self, raw: &[u8], part: &str) -> Result<Vec<u8>> {
        let decoded = match self {
            SegmentEncoding::Base64 => STANDARD_NO_PAD.decode(raw).ok(),
            SegmentEncoding::Hex => hex::decode(raw).ok(),
        };
        match decoded {
            Some(bytes) if !bytes.is_empty() => Ok(bytes),
            Some(_) => Err(Error::bad_hash(format!("empty {} part", part))),
            None => Err(Error::bad_hash(format!("corrupt {} part", part))),
        }
    }
}
