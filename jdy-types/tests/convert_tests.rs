use jdy_types::{
    convert_record, convert_value, converter_for, drop_clear_envelopes, Conversion, ConversionError,
    Converted, FieldDescriptor, FieldType,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Map, Value};

fn fields() -> Vec<FieldDescriptor> {
    vec![
        FieldDescriptor::new("title", FieldType::Text),
        FieldDescriptor::new("amount", FieldType::Number),
        FieldDescriptor::new("due", FieldType::Datetime),
        FieldDescriptor::new("tags", FieldType::CheckboxGroup),
        FieldDescriptor::new("owner", FieldType::User),
        FieldDescriptor::new("serial", FieldType::Serial),
    ]
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

fn convert(raw: Value) -> Conversion {
    convert_record(&object(raw), &fields())
}

// ── Tri-state: absent / null / value ────────────────────────────

#[test]
fn absent_key_emits_nothing() {
    let conversion = convert(json!({"title": "hello"}));
    assert!(!conversion.record.contains_key("amount"));
    assert!(!conversion.record.contains_key("due"));
}

#[test]
fn null_value_emits_clear_envelope_for_every_type() {
    let conversion = convert(json!({
        "title": null,
        "amount": null,
        "due": null,
        "tags": null,
        "owner": null,
        "serial": null
    }));
    for key in ["title", "amount", "due", "tags", "owner", "serial"] {
        assert_eq!(conversion.record[key], json!({"value": null}), "field {key}");
    }
    assert!(conversion.skipped.is_empty());
}

#[test]
fn concrete_value_emits_value_envelope() {
    let conversion = convert(json!({"title": "hello"}));
    assert_eq!(conversion.record["title"], json!({"value": "hello"}));
}

// ── Unknown fields are dropped ──────────────────────────────────

#[test]
fn keys_not_declared_by_the_form_never_reach_the_wire() {
    let conversion = convert(json!({"title": "x", "rogue": "y", "_nonsense": null}));
    assert_eq!(conversion.record.len(), 1);
    assert!(conversion.record.contains_key("title"));
}

#[test]
fn empty_field_list_yields_empty_record() {
    let conversion = convert_record(&object(json!({"title": "x"})), &[]);
    assert!(conversion.record.is_empty());
    assert!(conversion.skipped.is_empty());
}

// ── Text coercion ───────────────────────────────────────────────

#[test]
fn text_accepts_non_string_scalars() {
    let conversion = convert(json!({"title": 42}));
    assert_eq!(conversion.record["title"], json!({"value": "42"}));
}

#[test]
fn text_serializes_structured_values_to_compact_json() {
    let conversion = convert(json!({"title": {"a": 1}}));
    assert_eq!(conversion.record["title"], json!({"value": "{\"a\":1}"}));
}

// ── Numbers ─────────────────────────────────────────────────────

#[test]
fn number_parses_decimal_text() {
    let conversion = convert(json!({"amount": "42"}));
    assert_eq!(conversion.record["amount"], json!({"value": 42}));

    let conversion = convert(json!({"amount": "3.25"}));
    assert_eq!(conversion.record["amount"], json!({"value": 3.25}));
}

#[test]
fn number_blank_text_clears_instead_of_failing() {
    let conversion = convert(json!({"amount": "   "}));
    assert_eq!(conversion.record["amount"], json!({"value": null}));
}

#[test]
fn number_malformed_text_is_skipped_and_reported() {
    let conversion = convert(json!({"amount": "4x2", "title": "kept"}));
    assert!(!conversion.record.contains_key("amount"));
    assert_eq!(conversion.record["title"], json!({"value": "kept"}));
    assert_eq!(conversion.skipped.len(), 1);
    assert_eq!(conversion.skipped[0].field, "amount");
    assert!(matches!(
        conversion.skipped[0].error,
        ConversionError::InvalidNumber(_)
    ));
}

// ── Datetimes ───────────────────────────────────────────────────

#[test]
fn datetime_accepts_iso_instant() {
    let conversion = convert(json!({"due": "2024-10-22T20:26:29Z"}));
    assert_eq!(conversion.record["due"], json!({"value": "2024-10-22T20:26:29Z"}));
}

#[test]
fn datetime_normalizes_offsets_to_utc() {
    let conversion = convert(json!({"due": "2024-10-22T20:26:29+08:00"}));
    assert_eq!(conversion.record["due"], json!({"value": "2024-10-22T12:26:29Z"}));
}

#[test]
fn datetime_ten_digit_integer_is_seconds() {
    let conversion = convert(json!({"due": 1729628789_i64}));
    assert_eq!(conversion.record["due"], json!({"value": "2024-10-22T20:26:29Z"}));
}

#[test]
fn datetime_thirteen_digit_integer_is_milliseconds() {
    let conversion = convert(json!({"due": 1729628789000_i64}));
    assert_eq!(conversion.record["due"], json!({"value": "2024-10-22T20:26:29Z"}));
}

#[test]
fn datetime_other_shapes_are_skipped() {
    for bad in [json!(123), json!("yesterday"), json!(true), json!([1])] {
        let conversion = convert(json!({"due": bad}));
        assert!(!conversion.record.contains_key("due"));
        assert_eq!(conversion.skipped.len(), 1);
    }
}

// ── Choice groups ───────────────────────────────────────────────

#[test]
fn checkbox_group_coerces_elements_to_strings() {
    let conversion = convert(json!({"tags": ["a", 1, true]}));
    assert_eq!(conversion.record["tags"], json!({"value": ["a", "1", "true"]}));
}

#[test]
fn checkbox_group_rejects_non_arrays() {
    let conversion = convert(json!({"tags": "a"}));
    assert!(!conversion.record.contains_key("tags"));
    assert!(matches!(
        conversion.skipped[0].error,
        ConversionError::ExpectedArray(_)
    ));
}

// ── Attachments: keep / clear / set ─────────────────────────────

fn upload_field() -> Vec<FieldDescriptor> {
    vec![FieldDescriptor::new("files", FieldType::Upload)]
}

#[test]
fn attachments_without_keys_leave_the_field_untouched() {
    // Echoing back a read result (urls but no keys) must not erase
    // what is already attached.
    let raw = object(json!({"files": [{"name": "a.pdf", "url": "https://x/a.pdf"}]}));
    let conversion = convert_record(&raw, &upload_field());
    assert!(conversion.record.is_empty());
    assert!(conversion.skipped.is_empty());
}

#[test]
fn attachments_blank_key_sentinel_clears() {
    let raw = object(json!({"files": [{"key": ""}]}));
    let conversion = convert_record(&raw, &upload_field());
    assert_eq!(conversion.record["files"], json!({"value": null}));
}

#[test]
fn attachments_collect_non_blank_keys() {
    let raw = object(json!({"files": [
        {"key": "k2"},
        {"key": "k1"},
        {"key": ""},
        {"name": "no-key.png"},
        {"key": "k1"}
    ]}));
    let conversion = convert_record(&raw, &upload_field());
    assert_eq!(conversion.record["files"], json!({"value": ["k1", "k2"]}));
}

// ── Members, departments, phone ─────────────────────────────────

#[test]
fn user_extracts_username() {
    let conversion = convert(json!({"owner": {"username": "zhangsan", "name": "张三"}}));
    assert_eq!(conversion.record["owner"], json!({"value": "zhangsan"}));
}

#[test]
fn user_without_username_clears() {
    let conversion = convert(json!({"owner": {"name": "张三"}}));
    assert_eq!(conversion.record["owner"], json!({"value": null}));
}

#[test]
fn user_group_dedups_usernames() {
    let fields = vec![FieldDescriptor::new("team", FieldType::UserGroup)];
    let raw = object(json!({"team": [
        {"username": "b"}, {"username": "a"}, {"username": "b"}, {"username": ""}
    ]}));
    let conversion = convert_record(&raw, &fields);
    assert_eq!(conversion.record["team"], json!({"value": ["a", "b"]}));
}

#[test]
fn dept_group_dedups_numbers() {
    let fields = vec![FieldDescriptor::new("depts", FieldType::DeptGroup)];
    let raw = object(json!({"depts": [{"deptNo": 3}, {"dept_no": 1}, {"deptNo": 3}]}));
    let conversion = convert_record(&raw, &fields);
    assert_eq!(conversion.record["depts"], json!({"value": [1, 3]}));
}

#[test]
fn phone_extracts_number() {
    let fields = vec![FieldDescriptor::new("mobile", FieldType::Phone)];
    let raw = object(json!({"mobile": {"phone": "13888888888", "verified": false}}));
    let conversion = convert_record(&raw, &fields);
    assert_eq!(conversion.record["mobile"], json!({"value": "13888888888"}));
}

// ── Subforms ────────────────────────────────────────────────────

fn order_fields() -> Vec<FieldDescriptor> {
    vec![FieldDescriptor::subform(
        "lines",
        vec![
            FieldDescriptor::new("sku", FieldType::Text),
            FieldDescriptor::new("qty", FieldType::Number),
        ],
    )]
}

#[test]
fn subform_converts_rows_recursively() {
    let raw = object(json!({"lines": [
        {"sku": "A-1", "qty": "2", "rogue": true},
        {"sku": "B-9", "qty": null}
    ]}));
    let conversion = convert_record(&raw, &order_fields());
    assert_eq!(
        conversion.record["lines"],
        json!({"value": [
            {"sku": {"value": "A-1"}, "qty": {"value": 2}},
            {"sku": {"value": "B-9"}, "qty": {"value": null}}
        ]})
    );
}

#[test]
fn subform_preserves_row_ids_for_in_place_updates() {
    let raw = object(json!({"lines": [
        {"_id": "606290aba392ca00076da0a9", "sku": "A-1"}
    ]}));
    let conversion = convert_record(&raw, &order_fields());
    assert_eq!(
        conversion.record["lines"]["value"][0]["_id"],
        json!({"value": "606290aba392ca00076da0a9"})
    );
}

#[test]
fn subform_row_failure_skips_the_whole_subform() {
    let raw = object(json!({"lines": [{"sku": "A-1", "qty": "bogus"}]}));
    let conversion = convert_record(&raw, &order_fields());
    assert!(conversion.record.is_empty());
    assert_eq!(conversion.skipped[0].field, "lines");
}

#[test]
fn subform_rejects_non_array_values() {
    let raw = object(json!({"lines": {"sku": "A-1"}}));
    let conversion = convert_record(&raw, &order_fields());
    assert!(conversion.record.is_empty());
    assert!(matches!(
        conversion.skipped[0].error,
        ConversionError::ExpectedArray(_)
    ));
}

// ── Read-only types and registry ────────────────────────────────

#[test]
fn read_only_types_have_no_converter() {
    for ty in [
        FieldType::Serial,
        FieldType::Lookup,
        FieldType::Aggregation,
        FieldType::LinkData,
        FieldType::Signature,
    ] {
        assert!(converter_for(ty).is_none(), "{ty:?}");
    }
}

#[test]
fn read_only_field_with_value_is_left_untouched() {
    let conversion = convert(json!({"serial": "SN-0001"}));
    assert!(!conversion.record.contains_key("serial"));
    assert!(conversion.skipped.is_empty());
}

#[test]
fn convert_value_null_clears_even_without_converter() {
    let field = FieldDescriptor::new("x", FieldType::Lookup);
    let converted = convert_value(&Value::Null, &field).unwrap();
    assert_eq!(converted, Converted::Clear);
}

// ── ignore-null helper ──────────────────────────────────────────

#[test]
fn drop_clear_envelopes_keeps_only_set_fields() {
    let mut record = object(json!({
        "a": {"value": "x"},
        "b": {"value": null},
        "c": {}
    }));
    drop_clear_envelopes(&mut record);
    assert_eq!(record.len(), 1);
    assert!(record.contains_key("a"));
}
