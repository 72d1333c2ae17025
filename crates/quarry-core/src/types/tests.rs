use super::*;
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn test_numbers_stay_numbers() {
    assert_eq!(Value::Int16(-3).to_json_scalar(), json!(-3));
    assert_eq!(Value::Int64(9_007_199_254_740_993).to_json_scalar(), json!(9_007_199_254_740_993i64));
    assert_eq!(Value::Float64(2.5).to_json_scalar(), json!(2.5));
    assert_eq!(Value::Float32(1.1).to_json_scalar(), json!(1.1));
}

#[test]
fn test_non_finite_floats_become_strings() {
    assert_eq!(Value::Float64(f64::NAN).to_json_scalar(), json!("NaN"));
    assert_eq!(Value::Float64(f64::INFINITY).to_json_scalar(), json!("inf"));
}

#[test]
fn test_decimal_keeps_exact_text() {
    assert_eq!(
        Value::Decimal("12345678901234567890.0100".into()).to_json_scalar(),
        json!("12345678901234567890.0100")
    );
}

#[test]
fn test_temporal_values_are_iso_8601() {
    let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
    let time = NaiveTime::from_hms_milli_opt(13, 5, 9, 250).unwrap();

    assert_eq!(Value::Date(date).to_json_scalar(), json!("2024-02-29"));
    assert_eq!(Value::Time(time).to_json_scalar(), json!("13:05:09.250"));
    assert_eq!(
        Value::DateTime(date.and_time(time)).to_json_scalar(),
        json!("2024-02-29T13:05:09.250")
    );
    assert_eq!(
        Value::DateTimeUtc(date.and_time(time).and_utc()).to_json_scalar(),
        json!("2024-02-29T13:05:09.250+00:00")
    );
}

#[test]
fn test_binary_is_text_when_utf8_else_hex() {
    assert_eq!(Value::Bytes(b"hello".to_vec()).to_json_scalar(), json!("hello"));
    assert_eq!(
        Value::Bytes(vec![0xde, 0xad, 0xbe, 0xef]).to_json_scalar(),
        json!("\\xdeadbeef")
    );
}

#[test]
fn test_documents_and_arrays_are_compact_strings() {
    assert_eq!(
        Value::Json(json!({"a": [1, 2]})).to_json_scalar(),
        json!("{\"a\":[1,2]}")
    );
    assert_eq!(
        Value::Array(vec![Value::Int32(1), Value::Null, Value::String("x".into())]).to_json_scalar(),
        json!("[1,null,\"x\"]")
    );
}

#[test]
fn test_null_and_bool() {
    assert_eq!(Value::Null.to_json_scalar(), serde_json::Value::Null);
    assert_eq!(Value::Bool(false).to_json_scalar(), json!(false));
}

#[test]
fn test_as_bool_accepts_catalog_spellings() {
    assert_eq!(Value::String("YES".into()).as_bool(), Some(true));
    assert_eq!(Value::String("no".into()).as_bool(), Some(false));
    assert_eq!(Value::Int8(1).as_bool(), Some(true));
    assert_eq!(Value::Bool(false).as_bool(), Some(false));
    assert_eq!(Value::String("maybe".into()).as_bool(), None);
}

#[test]
fn test_row_lookup_by_name() {
    let result = QueryResult::from_rows(
        vec!["id".into(), "name".into()],
        vec![vec![Value::Int32(7), Value::String("ada".into())]],
    );

    assert_eq!(result.column_names(), vec!["id", "name"]);
    assert_eq!(result.row_count(), 1);
    let row = &result.rows[0];
    assert_eq!(row.get_by_name("name"), Some(&Value::String("ada".into())));
    assert_eq!(row.get_by_name("missing"), None);
    assert_eq!(row.get(0), Some(&Value::Int32(7)));
}
