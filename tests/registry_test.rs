//! Rule registry load-time validation

use simstats::operators::{Arity, Operator, OperatorKind, OperatorTable};
use simstats::rules::{RuleDefinition, RuleRegistry};
use simstats::{Error, Unavailable};

fn ratio_rule(patterns: &[&str]) -> RuleDefinition {
    RuleDefinition::new("hit_rate", patterns.iter().copied(), OperatorKind::Ratio, "")
}

#[test]
fn test_ratio_with_one_pattern_rejected() {
    let err = RuleRegistry::new([ratio_rule(&["^hits$"])]).unwrap_err();
    assert!(matches!(err, Error::InvalidRule { ref rule, .. } if rule == "hit_rate"));
    assert!(err.to_string().contains("exactly 2"));
}

#[test]
fn test_ratio_with_three_patterns_rejected() {
    let err = RuleRegistry::new([ratio_rule(&["^a$", "^b$", "^c$"])]).unwrap_err();
    assert!(matches!(err, Error::InvalidRule { .. }));
}

#[test]
fn test_ratio_with_two_patterns_accepted() {
    let registry = RuleRegistry::new([ratio_rule(&["^hits$", "^accesses$"])]).unwrap();
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_identity_requires_a_pattern() {
    let err = RuleRegistry::new([RuleDefinition::new(
        "empty",
        Vec::<String>::new(),
        OperatorKind::Identity,
        "",
    )])
    .unwrap_err();
    assert!(err.to_string().contains("at least 1"));
}

#[test]
fn test_duplicate_names_rejected() {
    let first = RuleDefinition::new("ipc", ["^a$"], OperatorKind::Identity, "");
    let second = RuleDefinition::new("ipc", ["^b$"], OperatorKind::Sum, "");
    let err = RuleRegistry::new([first, second]).unwrap_err();
    assert!(err.to_string().contains("duplicate rule name"));
}

#[test]
fn test_load_from_json() {
    let json = r#"[
        {
            "name": "cpu_ipc",
            "patterns": ["^system\\.cpu\\d+\\.ipc$"],
            "op": "identity",
            "desc": "mean IPC across CPU cores"
        },
        {
            "name": "L3_hit_pct",
            "patterns": ["^L3CacheMemory\\.m_demand_hits$", "^L3CacheMemory\\.m_demand_accesses$"],
            "op": "ratio",
            "description": "L3 hit rate (percent)",
            "scale": 100.0
        }
    ]"#;

    let registry = RuleRegistry::from_json_str(json).unwrap();
    assert_eq!(registry.names(), vec!["L3_hit_pct", "cpu_ipc"]);

    let rule = registry.get("L3_hit_pct").unwrap();
    assert_eq!(rule.op(), &OperatorKind::Ratio);
    assert!((rule.scale() - 100.0).abs() < f64::EPSILON);
    assert_eq!(registry.get("cpu_ipc").unwrap().description(), "mean IPC across CPU cores");
}

#[test]
fn test_json_with_bad_arity_is_invalid_rule() {
    let json = r#"[{"name": "r", "patterns": ["^a$"], "op": "ratio"}]"#;
    assert!(matches!(
        RuleRegistry::from_json_str(json),
        Err(Error::InvalidRule { .. })
    ));
}

#[test]
fn test_malformed_json_is_json_error() {
    assert!(matches!(
        RuleRegistry::from_json_str("[{\"name\": "),
        Err(Error::Json(_))
    ));
}

#[test]
fn test_builtin_ratio_cannot_be_replaced() {
    fn first(sets: &[Vec<f64>]) -> Result<f64, Unavailable> {
        sets[0].first().copied().ok_or(Unavailable::NoMatches)
    }

    let mut table = OperatorTable::builtin();
    let err = table
        .register(OperatorKind::Ratio, Operator::new(Arity::Exactly(1), first))
        .unwrap_err();
    assert!(err.to_string().contains("built-in operator 'ratio'"));
    assert_eq!(
        table.get(&OperatorKind::Ratio).unwrap().arity(),
        Arity::Exactly(2)
    );

    let err = RuleRegistry::with_operators([ratio_rule(&["^hits$"])], table).unwrap_err();
    assert!(matches!(err, Error::InvalidRule { ref rule, .. } if rule == "hit_rate"));
}

#[test]
fn test_registry_is_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<RuleRegistry>();
}
