use rowkeep::clause::Payload;
use rowkeep::{Clause, Flag, PrimaryKey, Value};

const FLAGS: [Flag; 6] = [
    Flag::PrimaryKey,
    Flag::Autoincrement,
    Flag::Unique,
    Flag::NotNull,
    Flag::Default,
    Flag::ForeignKey,
];

fn clause_of(bits: u8) -> Clause {
    FLAGS
        .iter()
        .enumerate()
        .filter(|(i, _)| bits & (1 << i) != 0)
        .fold(Clause::new(), |clause, (_, flag)| clause | *flag)
}

#[test]
fn empty_clause_has_no_flags() {
    let clause = Clause::new();
    assert!(clause.is_empty());
    for flag in FLAGS {
        assert!(!clause.test_flag(flag));
    }
}

#[test]
fn union_keeps_both_operands_intact() {
    let unique = Clause::unique();
    let not_null = Clause::not_null();
    let both = unique.clone() | not_null.clone();

    assert!(both.test_flag(Flag::Unique));
    assert!(both.test_flag(Flag::NotNull));
    assert!(unique.test_flag(Flag::Unique));
    assert!(!unique.test_flag(Flag::NotNull));
    assert!(!not_null.test_flag(Flag::Unique));
    assert!(not_null.test_flag(Flag::NotNull));
}

#[test]
fn union_flags_match_operand_flags_for_all_combinations() {
    for a in 0..64u8 {
        for b in 0..64u8 {
            let (left, right) = (clause_of(a), clause_of(b));
            let union = left.clone() | right.clone();
            for flag in FLAGS {
                assert_eq!(
                    union.test_flag(flag),
                    left.test_flag(flag) || right.test_flag(flag),
                    "{:?} in {:#08b} | {:#08b}",
                    flag,
                    a,
                    b
                );
            }
            assert_eq!(union, right.clone() | left.clone(), "union commutes");
        }
    }
}

#[test]
fn payload_of_one_side_survives_union() {
    let clause = Clause::not_null() | Clause::default_value("...");
    assert!(clause.test_flag(Flag::NotNull));
    assert!(clause.test_flag(Flag::Default));
    assert_eq!(
        clause.flag(Flag::Default),
        Some(&Payload::Default(Value::Text("...".to_string())))
    );
    assert!(clause.flag(Flag::ForeignKey).is_none());

    let reversed = Clause::default_value("...") | Clause::not_null();
    assert_eq!(clause, reversed);
}

#[test]
fn two_payloads_do_not_union() {
    let result = Clause::default_value(1).try_union(Clause::default_expression("CURRENT_TIMESTAMP"));
    assert!(result.is_err());
}

#[test]
#[should_panic]
fn or_with_two_payloads_panics() {
    let _ = Clause::default_value(1) | Clause::default_value(2);
}

#[test]
fn primary_key_declares_autoincrement() {
    let clause = PrimaryKey::declared_clause();
    assert!(clause.test_flag(Flag::PrimaryKey));
    assert!(clause.test_flag(Flag::Autoincrement));
    assert!(!clause.test_flag(Flag::NotNull));

    let key = PrimaryKey::default();
    assert!(key.clause().test_flag(Flag::PrimaryKey));
    assert!(key.id().is_none());
}

#[test]
fn payload_can_be_dropped() {
    let clause = (Clause::default_value(1) | Clause::unique()).without_payload();
    assert!(clause.test_flag(Flag::Unique));
    assert!(!clause.test_flag(Flag::Default));
    assert!(clause.payload().is_none());
    assert_eq!(Clause::not_null().without_payload(), Clause::not_null());
}
