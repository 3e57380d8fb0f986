use pretty_assertions::assert_eq;
use proptest::prelude::*;

use super::*;
use rebind_ir::IntKind;

fn int() -> CType {
    CType::Int(IntKind::Int)
}

#[test]
fn test_matcher_exact_and_pattern() {
    let exact = Matcher::exact("nng_aio_alloc");
    assert!(exact.matches("nng_aio_alloc"));
    assert!(!exact.matches("nng_aio_alloc2"));

    let pattern = Matcher::pattern("NNG_OPT_.*").unwrap();
    assert!(pattern.matches("NNG_OPT_RECVBUF"));
    // Anchored at both ends.
    assert!(!pattern.matches("X_NNG_OPT_RECVBUF"));
    assert_eq!(pattern.source(), "NNG_OPT_.*");
    assert_eq!(pattern.to_string(), "/NNG_OPT_.*/");
}

#[test]
fn test_matcher_prefix_escapes() {
    let prefix = Matcher::prefix("nng.");
    assert!(prefix.matches("nng.close"));
    assert!(!prefix.matches("nngXclose"));
}

#[test]
fn test_invalid_pattern() {
    let err = Matcher::pattern("NNG_(").unwrap_err();
    assert!(matches!(err, RuleError::InvalidPattern { ref pattern, .. } if pattern == "NNG_("));
}

#[test]
fn test_resolve_is_per_kind() {
    let mut registry = RuleRegistry::new();
    registry
        .register(DeclKind::Function, Matcher::exact("nng_close"), Action::Discard)
        .unwrap();
    assert_eq!(
        registry.resolve(DeclKind::Function, "nng_close"),
        Some(&Action::Discard)
    );
    assert_eq!(registry.resolve(DeclKind::Struct, "nng_close"), None);
    assert_eq!(registry.resolve(DeclKind::Function, "nng_open"), None);
}

#[test]
fn test_first_match_wins_without_exact_priority() {
    let mut registry = RuleRegistry::new();
    registry
        .register(
            DeclKind::Constant,
            Matcher::pattern("NNG_FLAG_.*").unwrap(),
            Action::RetypeAs(int()),
        )
        .unwrap();
    registry
        .register(
            DeclKind::Constant,
            Matcher::exact("NNG_FLAG_ALLOC"),
            Action::Discard,
        )
        .unwrap();
    assert_eq!(
        registry.resolve(DeclKind::Constant, "NNG_FLAG_ALLOC"),
        Some(&Action::RetypeAs(int()))
    );
}

#[test]
fn test_override_marshal_only_for_functions() {
    let mut registry = RuleRegistry::new();
    let action = Action::OverrideMarshal {
        slot: MarshalSlot::Return,
        direction: MarshalDirection::FromNative,
    };
    let err = registry
        .register(DeclKind::Constant, Matcher::exact("X"), action.clone())
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "`override_marshal` rules cannot target constant declarations"
    );
    assert!(registry.is_empty());
    registry
        .register(DeclKind::Function, Matcher::exact("nng_strerror"), action)
        .unwrap();
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_iter_groups_by_kind() {
    let mut registry = RuleRegistry::new();
    registry
        .register(DeclKind::Constant, Matcher::exact("B"), Action::Discard)
        .unwrap();
    registry
        .register(DeclKind::Function, Matcher::exact("a"), Action::Discard)
        .unwrap();
    let lines: Vec<String> = registry.iter().map(ToString::to_string).collect();
    assert_eq!(
        lines,
        vec!["function `a` -> discard", "constant `B` -> discard"]
    );
}

#[test]
fn test_shadowed_exact_rule_is_reported() {
    let mut registry = RuleRegistry::new();
    registry
        .register(
            DeclKind::Constant,
            Matcher::pattern("NNG_OPT_.*").unwrap(),
            Action::RetypeAs(CType::pointer_to(CType::Int(IntKind::Char), false)),
        )
        .unwrap();
    registry
        .register(
            DeclKind::Constant,
            Matcher::exact("NNG_OPT_SOCKNAME"),
            Action::Discard,
        )
        .unwrap();
    // Same name under a different kind is not shadowed.
    registry
        .register(
            DeclKind::Function,
            Matcher::exact("NNG_OPT_SOCKNAME"),
            Action::Discard,
        )
        .unwrap();

    let warnings = registry.shadowed();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].code, ErrorCode::W2001);
    assert!(!warnings[0].is_error());
    assert_eq!(
        warnings[0].message,
        "constant rule #2 for `NNG_OPT_SOCKNAME` can never apply"
    );
    assert_eq!(
        warnings[0].notes,
        vec!["rule #1 (constant /NNG_OPT_.*/ -> retype as `char*`) matches first and wins"]
    );
}

#[test]
fn test_no_shadowing_when_exact_comes_first() {
    let mut registry = RuleRegistry::new();
    registry
        .register(DeclKind::Constant, Matcher::exact("NNG_FLAG_ALLOC"), Action::Discard)
        .unwrap();
    registry
        .register(
            DeclKind::Constant,
            Matcher::prefix("NNG_FLAG_"),
            Action::RetypeAs(int()),
        )
        .unwrap();
    assert!(registry.shadowed().is_empty());
}

fn arb_matcher() -> impl Strategy<Value = Matcher> {
    prop_oneof![
        "[ab]{1,3}".prop_map(Matcher::Exact),
        "[ab]{0,2}".prop_map(|p| Matcher::prefix(&p)),
    ]
}

proptest! {
    #[test]
    fn prop_resolve_is_first_linear_match(
        matchers in prop::collection::vec(arb_matcher(), 0..6),
        name in "[ab]{1,3}",
    ) {
        let mut registry = RuleRegistry::new();
        for (i, matcher) in matchers.iter().enumerate() {
            let action = Action::RetypeAs(CType::Named(format!("t{i}")));
            registry.register(DeclKind::Constant, matcher.clone(), action).unwrap();
        }
        let expected = matchers
            .iter()
            .position(|m| m.matches(&name))
            .map(|i| Action::RetypeAs(CType::Named(format!("t{i}"))));
        prop_assert_eq!(registry.resolve(DeclKind::Constant, &name).cloned(), expected);
    }

    #[test]
    fn prop_swapping_rules_only_affects_shared_names(
        first in arb_matcher(),
        second in arb_matcher(),
        name in "[ab]{1,3}",
    ) {
        let rules = [
            (first.clone(), Action::Discard),
            (second.clone(), Action::RetypeAs(CType::Void)),
        ];
        let mut forward = RuleRegistry::new();
        let mut swapped = RuleRegistry::new();
        for (matcher, action) in &rules {
            forward.register(DeclKind::Function, matcher.clone(), action.clone()).unwrap();
        }
        for (matcher, action) in rules.iter().rev() {
            swapped.register(DeclKind::Function, matcher.clone(), action.clone()).unwrap();
        }

        let before = forward.resolve(DeclKind::Function, &name);
        let after = swapped.resolve(DeclKind::Function, &name);
        if first.matches(&name) && second.matches(&name) {
            prop_assert_eq!(before, Some(&Action::Discard));
            prop_assert_eq!(after, Some(&Action::RetypeAs(CType::Void)));
        } else {
            prop_assert_eq!(before, after);
        }
    }
}
