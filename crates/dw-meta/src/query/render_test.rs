use super::*;

#[test]
fn scalars() {
    assert_eq!(render_value(&Value::Null), "null");
    assert_eq!(render_value(&Value::Boolean(false)), "false");
    assert_eq!(render_value(&Value::Int(-7)), "-7");
    assert_eq!(render_value(&Value::UBigInt(u64::MAX)), "18446744073709551615");
    assert_eq!(render_value(&Value::Double(2.5)), "2.5");
    assert_eq!(render_value(&Value::Text("orders".into())), "orders");
}

#[test]
fn dates_around_the_epoch() {
    assert_eq!(render_value(&Value::Date32(0)), "1970-01-01");
    assert_eq!(render_value(&Value::Date32(-1)), "1969-12-31");
    assert_eq!(render_value(&Value::Date32(19_000)), "2022-01-08");
    assert_eq!(render_value(&Value::Date32(11_016)), "2000-02-29");
}

#[test]
fn timestamps_in_any_unit() {
    assert_eq!(
        render_value(&Value::Timestamp(TimeUnit::Second, 1_700_000_000)),
        "2023-11-14 22:13:20"
    );
    assert_eq!(
        render_value(&Value::Timestamp(TimeUnit::Microsecond, 1_500_000)),
        "1970-01-01 00:00:01.500000"
    );
    assert_eq!(
        render_value(&Value::Timestamp(TimeUnit::Millisecond, -1_000)),
        "1969-12-31 23:59:59"
    );
}

#[test]
fn lists_render_their_items() {
    let list = Value::List(vec![Value::Int(1), Value::Null, Value::Text("x".into())]);
    assert_eq!(render_value(&list), "[1, null, x]");
}
