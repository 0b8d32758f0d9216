//! 集成测试：参数配置
//!
//! 测试从应用配置中加载方案参数以及配置校验。

use passwd::schemes::{Argon2Profile, Argon2Scheme, BcryptProfile, ScryptProfile, ScryptScheme};
use passwd::{Error, ParamParsing, Preference};

/// 测试部分字段的 argon2 配置使用默认值补齐
#[test]
fn test_argon2_profile_from_json() {
    let profile: Argon2Profile = serde_json::from_str(r#"{"memory": 131072, "time": 2}"#).unwrap();

    assert_eq!(profile.memory, 131072);
    assert_eq!(profile.time, 2);
    assert_eq!(profile.threads, 4);
    assert_eq!(profile.parsing, ParamParsing::Strict);
    assert!(profile.validate().is_ok());
}

/// 测试解析策略的序列化格式
#[test]
fn test_param_parsing_serde() {
    let profile: ScryptProfile = serde_json::from_str(r#"{"n": 32768, "parsing": "lenient"}"#).unwrap();
    assert_eq!(profile.n, 32768);
    assert_eq!(profile.parsing, ParamParsing::Lenient);

    let json = serde_json::to_value(&profile).unwrap();
    assert_eq!(json["parsing"], "lenient");
    assert_eq!(json["r"], 8);
}

/// 测试 bcrypt 配置
#[test]
fn test_bcrypt_profile_from_json() {
    let profile: BcryptProfile = serde_json::from_str("{}").unwrap();
    assert_eq!(profile.cost, passwd::schemes::BCRYPT_DEFAULT_COST);

    let profile: BcryptProfile = serde_json::from_str(r#"{"cost": 12}"#).unwrap();
    assert_eq!(profile.cost, 12);
}

/// 测试超出范围的 bcrypt cost 在构造方案前被校验拒绝
#[test]
fn test_bcrypt_profile_validate() {
    let profile: BcryptProfile = serde_json::from_str(r#"{"cost": 40}"#).unwrap();
    let err = profile.validate().unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert!(err.to_string().contains("cost"));

    let profile: BcryptProfile = serde_json::from_str(r#"{"cost": 12}"#).unwrap();
    assert!(profile.validate().is_ok());
    assert_eq!(passwd::schemes::BcryptScheme::new(profile).cost(), 12);
}

/// 测试加载的配置直接用于强度评估
#[test]
fn test_loaded_profile_drives_preference() {
    let hash = b"$argon2id$v=19,m=32768,t=3,p=4$LdaB2Z4EI4lwpxTc78QUFw$VhlPSK0tdF226QCLC24IIrmQcMBmg47Ik9h/Yq6htFI";

    let strict: Argon2Profile = serde_json::from_str(r#"{"memory": 65536}"#).unwrap();
    assert!(!Argon2Scheme::argon2id().with_profile(strict).is_preferred(hash));

    let relaxed: Argon2Profile =
        serde_json::from_str(r#"{"memory": 16384, "time": 1, "threads": 1}"#).unwrap();
    assert!(Argon2Scheme::argon2id().with_profile(relaxed).is_preferred(hash));
}

/// 测试无效配置被校验拒绝
#[test]
fn test_invalid_profiles_rejected() {
    let profile: ScryptProfile = serde_json::from_str(r#"{"n": 1000}"#).unwrap();
    let err = profile.validate().unwrap_err();
    assert!(matches!(err, Error::Config(_)));

    let profile: Argon2Profile = serde_json::from_str(r#"{"version": 18}"#).unwrap();
    assert!(profile.validate().is_err());
}

/// 测试 scrypt 配置加载后用于生成
#[test]
fn test_scrypt_profile_generates() {
    let profile: ScryptProfile =
        serde_json::from_str(r#"{"n": 1024, "r": 4, "salt_len": 8, "key_len": 16}"#).unwrap();
    assert!(profile.validate().is_ok());

    let scheme = ScryptScheme::s2().with_profile(profile);
    let hash = passwd::Scheme::derive(&scheme, b"passwd", None).unwrap();
    assert!(hash.starts_with(b"$s2$1024$4$1$"));
    assert!(scheme.is_preferred(&hash));
}
