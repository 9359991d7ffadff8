use rowkeep::expression::Operand;
use rowkeep::{Expression, Value, Where};

#[test]
fn shorthand_keeps_trailing_operator() {
    assert_eq!(Where::new("key = ", 3).to_string(), "key = 3");
    assert_eq!(Where::new("key=", 3).to_string(), "key = 3");
    assert_eq!(Where::new("  key  ", 3).to_string(), "key = 3");
    assert_eq!(Where::new("price >", 3).to_string(), "price > 3");
    assert_eq!(Where::new("price>=", 3).to_string(), "price >= 3");
    assert_eq!(Where::new("price <>", 3).to_string(), "price <> 3");
    assert_eq!(Where::new("name like", "a%").to_string(), "name like 'a%'");
}

#[test]
fn comparison_exposes_its_parts() {
    let filter = Where::new("price >", 3);
    assert_eq!(filter.left(), Some(&Operand::Column("price".to_string())));
    assert_eq!(filter.op(), Some(">"));
    assert_eq!(filter.right(), Some(&Operand::Value(Value::Integer(3))));

    // the bound side is a value, not column text
    assert!(!matches!(filter.right(), Some(Operand::Column(_))));
}

#[test]
fn logical_nodes_are_parenthesised() {
    let filter = Where::new("price <=", 10) & Where::new("qty >", 100);
    assert_eq!(filter.to_string(), "( price <= 10 ) and ( qty > 100 )");

    let filter = Where::new("price <=", 10).or(Where::new("qty >", 100));
    assert_eq!(filter.to_string(), "( price <= 10 ) or ( qty > 100 )");
}

#[test]
fn column_to_column_comparisons() {
    assert_eq!(Where::column("price").equal("qty").to_string(), "price = qty");
    assert_eq!(Where::column("price").not_equal("qty").to_string(), "price <> qty");

    let expression = Expression::new(&Where::column("price").equal("qty"));
    assert_eq!(expression.string(), "price = qty");
    assert!(expression.arguments().is_empty());
}

#[test]
fn expression_binds_values_in_order() {
    let filter = Where::new("key =", "abc") & Where::new("length >", 5);
    let expression = Expression::new(&filter);
    assert_eq!(expression.string(), "(key = :arg0) and (length > :arg1)");
    assert_eq!(
        expression.arguments(),
        &[Value::Text("abc".to_string()), Value::Integer(5)]
    );
    assert_eq!(
        expression.bindings(),
        vec![
            ("arg0".to_string(), Value::Text("abc".to_string())),
            ("arg1".to_string(), Value::Integer(5)),
        ]
    );
}

#[test]
fn explicit_operator_form() {
    let expression = Expression::new(&Where::with_op(" key ", "=", "config1"));
    assert_eq!(expression.string(), "key = :arg0");

    let expression = Expression::new(&Where::column("height").ge(150));
    assert_eq!(expression.string(), "height >= :arg0");
    assert_eq!(expression.arguments(), &[Value::Integer(150)]);
}

#[test]
fn placeholders_line_up_with_arguments() {
    let filter = (Where::new("a =", 1) | Where::new("b <", 2.5))
        & (Where::column("c").equal("d") & (Where::new("e", "x") | Where::new("f !=", true)));
    let expression = Expression::new(&filter);

    let placeholders = expression.string().matches(":arg").count();
    assert_eq!(placeholders, expression.arguments().len());
    assert_eq!(placeholders, 4);
    for (i, value) in expression.arguments().iter().enumerate() {
        assert!(expression.string().contains(&format!(":arg{}", i)));
        assert_eq!(expression.bindings()[i].1, *value);
    }
    assert_eq!(
        expression.string(),
        "((a = :arg0) or (b < :arg1)) and ((c = d) and ((e = :arg2) or (f != :arg3)))"
    );
}

#[test]
fn bare_column_is_emitted_verbatim() {
    let filter: Where = Where::column("deleted_at IS NULL").into();
    let expression = Expression::from(filter);
    assert_eq!(expression.string(), "deleted_at IS NULL");
    assert!(expression.arguments().is_empty());
}
