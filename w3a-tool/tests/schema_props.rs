use proptest::prelude::*;
use serde_json::{Map, Value, json};
use w3a_tool::{SchemaFixOptions, fix_schema};

fn type_value() -> impl Strategy<Value = Value> {
    let names = prop::sample::select(vec!["string", "number", "integer", "boolean", "array", "object", "null"]);
    prop_oneof![
        names.clone().prop_map(|n| json!(n)),
        prop::collection::vec(names, 1..4).prop_map(|v| json!(v)),
    ]
}

fn enum_value() -> impl Strategy<Value = Value> {
    prop::collection::vec(
        prop_oneof![
            any::<i64>().prop_map(|n| json!(n)),
            any::<bool>().prop_map(|b| json!(b)),
            "[a-z]{1,6}".prop_map(|s| json!(s)),
        ],
        1..5,
    )
    .prop_map(Value::Array)
}

/// Parameter names, including ones that collide with schema keywords.
fn param_name() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => "[a-z]{1,8}",
        1 => prop::sample::select(vec![
            "definitions",
            "additionalProperties",
            "$ref",
            "$schema",
            "type",
            "items",
            "enum",
        ])
        .prop_map(str::to_string),
    ]
}

fn schema() -> impl Strategy<Value = Value> {
    let leaf = (type_value(), prop::option::of(enum_value())).prop_map(|(ty, en)| {
        let mut map = Map::new();
        map.insert("type".into(), ty);
        if let Some(en) = en {
            map.insert("enum".into(), en);
        }
        Value::Object(map)
    });

    leaf.prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::btree_map(param_name(), inner.clone(), 0..5).prop_map(|props| {
                json!({
                    "type": "object",
                    "additionalProperties": false,
                    "properties": props.into_iter().collect::<Map<String, Value>>()
                })
            }),
            inner.clone().prop_map(|item| json!({"type": "array", "items": item})),
            prop::collection::vec(inner, 1..3).prop_map(|alts| json!({"anyOf": alts})),
        ]
    })
}

fn assert_repaired(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(ty) = map.get("type") {
                assert!(!ty.is_array(), "type union survived: {value}");
                if ty == "array" {
                    assert!(map.contains_key("items"), "array without items: {value}");
                }
            }
            if let Some(Value::Array(members)) = map.get("enum") {
                assert!(members.iter().all(Value::is_string), "non-string enum: {value}");
            }
            assert!(!map.contains_key("additionalProperties"));
            for (key, child) in map {
                match child {
                    Value::Object(params) if key == "properties" => {
                        params.values().for_each(assert_repaired)
                    }
                    _ => assert_repaired(child),
                }
            }
        }
        Value::Array(items) => items.iter().for_each(assert_repaired),
        _ => {}
    }
}

fn property_names(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if let (true, Value::Object(params)) = (key == "properties", child) {
                    out.extend(params.keys().cloned());
                    params.values().for_each(|v| property_names(v, out));
                } else {
                    property_names(child, out);
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|v| property_names(v, out)),
        _ => {}
    }
}

#[test]
fn reserved_parameter_names_are_kept() {
    let mut schema = json!({
        "type": "object",
        "properties": {
            "definitions": {"type": "string"},
            "additionalProperties": {"type": "boolean"}
        },
        "required": ["definitions"]
    });
    fix_schema(&mut schema, &SchemaFixOptions::default());

    assert_eq!(schema["properties"]["definitions"], json!({"type": "string"}));
    assert_eq!(schema["properties"]["additionalProperties"], json!({"type": "boolean"}));
    assert_eq!(schema["required"], json!(["definitions"]));
}

proptest! {
    #[test]
    fn repaired_schemas_are_model_compatible(mut value in schema()) {
        fix_schema(&mut value, &SchemaFixOptions::default());
        assert_repaired(&value);
    }

    #[test]
    fn repair_keeps_every_parameter(mut value in schema()) {
        let mut before = Vec::new();
        property_names(&value, &mut before);
        fix_schema(&mut value, &SchemaFixOptions::default());
        let mut after = Vec::new();
        property_names(&value, &mut after);
        prop_assert_eq!(before, after);
    }

    #[test]
    fn repair_is_idempotent(mut value in schema()) {
        let options = SchemaFixOptions::default();
        fix_schema(&mut value, &options);
        let once = value.clone();
        let report = fix_schema(&mut value, &options);
        prop_assert!(report.is_empty());
        prop_assert_eq!(once, value);
    }
}
