use std::fs;

use pretty_assertions::assert_eq;

use super::*;
use rebind_ir::{CType, IntKind};

#[test]
fn test_empty_object_is_the_nng_convention() {
    let config = GeneratorConfig::from_json("{}").unwrap();
    assert_eq!(config, GeneratorConfig::default());
    assert_eq!(config.source, PathBuf::from("ext/nng/include"));
    assert_eq!(config.dest, PathBuf::from("nng-sys/src"));
    assert_eq!(config.rules.len(), 7);
}

#[test]
fn test_preset_registry() {
    let registry = GeneratorConfig::default().registry().unwrap();
    assert_eq!(registry.len(), 7);
    assert!(registry.shadowed().is_empty());
    assert_eq!(
        registry.resolve(DeclKind::Function, "nng_thread_create"),
        Some(&Action::Discard)
    );
    assert_eq!(
        registry.resolve(DeclKind::Constant, "NNG_OPT_RECVTIMEO"),
        Some(&Action::RetypeAs(CType::pointer_to(
            CType::Int(IntKind::Char),
            false
        )))
    );
    assert_eq!(
        registry.resolve(DeclKind::Constant, "NNG_DURATION_DEFAULT"),
        Some(&Action::RetypeAs(CType::Int(IntKind::Int)))
    );
    assert_eq!(registry.resolve(DeclKind::Constant, "NNG_MAXADDRLEN"), None);
}

#[test]
fn test_rules_from_json() {
    let config = GeneratorConfig::from_json(
        r#"{
            "library": "nng_mock",
            "rules": [
                { "kind": "typealias", "match": { "prefix": "nng_" }, "action": { "retype_as": "uint64_t" } },
                {
                    "kind": "function",
                    "match": { "exact": "nng_version" },
                    "action": { "override_marshal": { "slot": "return", "direction": "from_native" } }
                }
            ]
        }"#,
    )
    .unwrap();
    assert_eq!(config.library, "nng_mock");
    assert_eq!(config.module, "nng");

    let registry = config.registry().unwrap();
    assert_eq!(
        registry.resolve(DeclKind::TypeAlias, "nng_duration"),
        Some(&Action::RetypeAs(CType::Int(IntKind::U64)))
    );
    assert_eq!(
        registry.resolve(DeclKind::Function, "nng_version"),
        Some(&Action::OverrideMarshal {
            slot: MarshalSlot::Return,
            direction: MarshalDirection::FromNative,
        })
    );
}

#[test]
fn test_unknown_fields_are_rejected() {
    let err = GeneratorConfig::from_json(r#"{ "sources": "x" }"#).unwrap_err();
    assert!(matches!(err, ConfigError::Json(_)));
    assert!(err.to_string().contains("unknown field `sources`"));
}

#[test]
fn test_rule_errors_name_the_rule() {
    let bad_type = GeneratorConfig::from_json(
        r#"{ "rules": [
            { "kind": "function", "match": { "exact": "a" }, "action": "discard" },
            { "kind": "constant", "match": { "exact": "B" }, "action": { "retype_as": "not a type" } }
        ] }"#,
    )
    .unwrap();
    let err = bad_type.registry().unwrap_err();
    assert_eq!(err.to_string(), "rule #2: `not a type` is not a C type name");

    let bad_kind = GeneratorConfig::from_json(
        r#"{ "rules": [
            { "kind": "enum", "match": { "exact": "e" },
              "action": { "override_marshal": { "slot": "x", "direction": "to_native" } } }
        ] }"#,
    )
    .unwrap();
    assert_eq!(
        bad_kind.registry().unwrap_err().to_string(),
        "rule #1: `override_marshal` rules cannot target enum declarations"
    );

    let bad_pattern = GeneratorConfig::from_json(
        r#"{ "rules": [ { "kind": "struct", "match": { "pattern": "(" }, "action": "discard" } ] }"#,
    )
    .unwrap();
    assert!(matches!(
        bad_pattern.registry().unwrap_err(),
        ConfigError::Rule {
            index: 1,
            source: RuleError::InvalidPattern { .. }
        }
    ));
}

#[test]
fn test_defines() {
    assert_eq!(
        parse_define("NNG_SHARED_LIB").unwrap(),
        ("NNG_SHARED_LIB".to_string(), None)
    );
    assert_eq!(
        parse_define("NNG_MAX=4").unwrap(),
        ("NNG_MAX".to_string(), Some("4".to_string()))
    );
    assert!(matches!(
        parse_define("1BAD"),
        Err(ConfigError::InvalidDefine(_))
    ));
    assert!(parse_define("=1").is_err());

    let options = GeneratorConfig::default().header_options().unwrap();
    assert_eq!(
        options.defines,
        vec![
            ("NNG_SHARED_LIB".to_string(), None),
            ("NNG_ELIDE_DEPRECATED".to_string(), None),
        ]
    );
    assert_eq!(options.exclude, vec!["compat", "supplemental"]);
}

#[test]
fn test_pretty_json_reloads() {
    let config = GeneratorConfig {
        value_equality_suffix: "_t".into(),
        ..GeneratorConfig::default()
    };
    let text = config.to_json_pretty().unwrap();
    assert!(text.contains(r#""retype_as": "char*""#));
    assert_eq!(GeneratorConfig::from_json(&text).unwrap(), config);
}

#[test]
fn test_load_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rebind.json");
    fs::write(&path, r#"{ "output_file": "bindings.rs" }"#).unwrap();
    let config = GeneratorConfig::load(&path).unwrap();
    assert_eq!(config.output_file, "bindings.rs");
    assert_eq!(config.transform_options().file_name, "bindings.rs");

    let missing = GeneratorConfig::load(&dir.path().join("missing.json")).unwrap_err();
    assert!(matches!(missing, ConfigError::Io { .. }));
    assert!(missing.to_string().starts_with("failed to read config"));
}
