#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    reason = "Test-only assertions favor direct unwrap/expect for clarity."
)]

use jsonschema::Draft;
use jsonschema::JSONSchema;
use prost_types::DescriptorProto;
use prost_types::EnumDescriptorProto;
use prost_types::EnumValueDescriptorProto;
use prost_types::FileDescriptorProto;
use prost_types::SourceCodeInfo;
use prost_types::field_descriptor_proto::Type;
use prost_types::source_code_info::Location;

use crate::descriptor::CommentIndex;
use crate::descriptor::TypeRegistry;
use crate::test_support;

use super::*;

fn project(registry: &TypeRegistry, name: &str) -> Value {
    let projector = SchemaProjector::new(registry.comments());
    projector.project(&test_support::message(registry, name)).expect("projection succeeds")
}

fn assert_draft7(schema: &Value) {
    JSONSchema::options()
        .with_draft(Draft::Draft7)
        .compile(schema)
        .expect("schema must be legal JSON Schema Draft 7");
}

#[test]
fn scalar_kinds_follow_the_projection_table() {
    let registry = test_support::registry(vec![test_support::kitchen_file()]);
    let schema = project(&registry, "kitchen.Everything");
    let properties = schema["properties"].as_object().expect("properties object");
    let rows = [
        ("flag", json!({ "type": "boolean" })),
        ("plain_int32", json!({ "type": "integer", "format": "int32" })),
        ("small_sint", json!({ "type": "integer", "format": "int32" })),
        ("small_sfixed", json!({ "type": "integer", "format": "int32" })),
        ("plain_int64", json!({ "type": "integer", "format": "int64" })),
        ("large_sint", json!({ "type": "integer", "format": "int64" })),
        ("large_sfixed", json!({ "type": "integer", "format": "int64" })),
        ("plain_uint32", json!({ "type": "integer", "format": "uint32", "minimum": 0 })),
        ("small_fixed", json!({ "type": "integer", "format": "uint32", "minimum": 0 })),
        ("plain_uint64", json!({ "type": "integer", "format": "uint64", "minimum": 0 })),
        ("large_fixed", json!({ "type": "integer", "format": "uint64", "minimum": 0 })),
        ("ratio", json!({ "type": "number", "format": "float" })),
        ("precise_ratio", json!({ "type": "number", "format": "double" })),
        ("label", json!({ "type": "string" })),
        ("blob", json!({ "type": "string", "format": "byte" })),
    ];
    for (name, expected) in rows {
        assert_eq!(properties[name], expected, "projection row for {name}");
    }
}

#[test]
fn repeated_fields_project_to_arrays() {
    let registry = test_support::registry(vec![test_support::kitchen_file()]);
    let schema = project(&registry, "kitchen.Everything");
    assert_eq!(
        schema["properties"]["tags"],
        json!({ "type": "array", "items": { "type": "string" } })
    );
}

#[test]
fn map_fields_project_to_pattern_properties() {
    let registry = test_support::registry(vec![test_support::kitchen_file()]);
    let schema = project(&registry, "kitchen.Everything");
    assert_eq!(
        schema["properties"]["attrs"],
        json!({
            "type": "object",
            "patternProperties": { ".*": { "type": "integer", "format": "int32" } },
            "additionalProperties": false,
        })
    );
}

#[test]
fn enums_project_to_label_sets() {
    let registry = test_support::registry(vec![test_support::kitchen_file()]);
    let schema = project(&registry, "kitchen.Everything");
    assert_eq!(
        schema["properties"]["mood"],
        json!({ "type": "string", "enum": ["MOOD_UNSPECIFIED", "HAPPY"] })
    );
}

#[test]
fn presence_semantics_drive_the_required_list() {
    let registry = test_support::registry(vec![test_support::kitchen_file()]);
    let schema = project(&registry, "kitchen.Everything");
    let required: Vec<&str> = schema["required"]
        .as_array()
        .expect("required list")
        .iter()
        .map(|value| value.as_str().expect("required entry"))
        .collect();
    // Plain singular scalars and repeated/map fields are required.
    assert!(required.contains(&"flag"));
    assert!(required.contains(&"label"));
    assert!(required.contains(&"tags"));
    assert!(required.contains(&"attrs"));
    // Optional-marked, one-of member, and message fields are not.
    assert!(!required.contains(&"email"));
    assert!(!required.contains(&"either_text"));
    assert!(!required.contains(&"either_count"));
    assert!(!required.contains(&"node"));
    assert!(!required.contains(&"stamped_at"));
}

#[test]
fn oneof_groups_project_one_alternative_per_member() {
    let registry = test_support::registry(vec![test_support::kitchen_file()]);
    let schema = project(&registry, "kitchen.Everything");
    let choice = &schema["properties"]["choice"];
    assert_eq!(choice["type"], json!("object"));
    let alternatives = choice["oneOf"].as_array().expect("oneOf alternatives");
    assert_eq!(alternatives.len(), 2);
    assert_eq!(
        alternatives[0],
        json!({
            "type": "object",
            "properties": { "either_text": { "type": "string" } },
            "required": ["either_text"],
        })
    );
    assert_eq!(alternatives[1]["required"], json!(["either_count"]));
}

#[test]
fn synthetic_optional_oneofs_are_not_projected() {
    let registry = test_support::registry(vec![test_support::kitchen_file()]);
    let schema = project(&registry, "kitchen.Everything");
    let properties = schema["properties"].as_object().expect("properties object");
    assert!(properties.contains_key("email"));
    assert!(!properties.contains_key("_email"));
}

#[test]
fn well_known_types_project_to_canonical_shapes() {
    let registry = test_support::registry(vec![test_support::kitchen_file()]);
    let schema = project(&registry, "kitchen.Everything");
    let stamped = &schema["properties"]["stamped_at"];
    assert_eq!(stamped["type"], json!("string"));
    assert_eq!(stamped["format"], json!("date-time"));
}

#[test]
fn cyclic_messages_terminate_with_refs() {
    let registry = test_support::registry(vec![test_support::kitchen_file()]);
    let schema = project(&registry, "kitchen.Node");
    assert_eq!(schema["properties"]["value"], json!({ "type": "string" }));
    assert_eq!(schema["properties"]["next"], json!({ "$ref": "#/definitions/kitchen.Node" }));
    let definition = &schema["definitions"]["kitchen.Node"];
    assert_eq!(
        definition["properties"]["next"],
        json!({ "$ref": "#/definitions/kitchen.Node" })
    );
    assert_draft7(&schema);
}

#[test]
fn siblings_of_a_shared_type_both_expand() {
    // The on-stack set admits re-entry for siblings: only true recursion
    // becomes a reference.
    let registry = test_support::registry(vec![test_support::kitchen_file()]);
    let schema = project(&registry, "kitchen.Everything");
    let node = &schema["properties"]["node"];
    assert_eq!(node["type"], json!("object"));
    assert_eq!(node["properties"]["next"], json!({ "$ref": "#/definitions/kitchen.Node" }));
}

#[test]
fn projected_schemas_are_legal_draft7_objects() {
    let registry =
        test_support::registry(vec![test_support::hello_file(), test_support::kitchen_file()]);
    for name in ["hello.HelloRequest", "hello.HelloReply", "kitchen.Everything", "kitchen.Node"] {
        let schema = project(&registry, name);
        assert_eq!(schema["type"], json!("object"), "top level of {name}");
        assert_draft7(&schema);
    }
}

#[test]
fn comments_carry_through_to_descriptions() {
    let registry = test_support::registry(vec![test_support::hello_file()]);
    let schema = project(&registry, "hello.HelloRequest");
    assert_eq!(schema["description"], json!("The request for SayHello."));
    assert_eq!(schema["properties"]["name"]["description"], json!("Caller display name."));
}

#[test]
fn missing_source_info_projects_without_descriptions() {
    let mut file = test_support::hello_file();
    file.source_code_info = None;
    let registry = test_support::registry(vec![file]);
    let schema = project(&registry, "hello.HelloRequest");
    assert_eq!(schema["properties"]["name"], json!({ "type": "string" }));
    assert_eq!(schema["required"], json!(["name"]));
    assert!(schema.get("description").is_none());
}

#[test]
fn enum_value_comments_populate_enum_descriptions() {
    let file = FileDescriptorProto {
        name: Some("mood.proto".to_string()),
        package: Some("mood".to_string()),
        syntax: Some("proto3".to_string()),
        message_type: vec![DescriptorProto {
            name: Some("Holder".to_string()),
            field: vec![test_support::typed_field("mood", 1, Type::Enum, ".mood.Mood")],
            ..Default::default()
        }],
        enum_type: vec![EnumDescriptorProto {
            name: Some("Mood".to_string()),
            value: vec![
                EnumValueDescriptorProto {
                    name: Some("MOOD_UNSPECIFIED".to_string()),
                    number: Some(0),
                    ..Default::default()
                },
                EnumValueDescriptorProto {
                    name: Some("HAPPY".to_string()),
                    number: Some(1),
                    ..Default::default()
                },
            ],
            ..Default::default()
        }],
        source_code_info: Some(SourceCodeInfo {
            location: vec![
                Location {
                    path: vec![5, 0],
                    leading_comments: Some("How the caller feels.".to_string()),
                    ..Default::default()
                },
                Location {
                    path: vec![5, 0, 2, 1],
                    leading_comments: Some("Feeling good.".to_string()),
                    ..Default::default()
                },
            ],
        }),
        ..Default::default()
    };
    let registry = test_support::registry(vec![file]);
    let schema = project(&registry, "mood.Holder");
    let mood = &schema["properties"]["mood"];
    assert_eq!(mood["description"], json!("How the caller feels."));
    assert_eq!(mood["enumDescriptions"], json!({ "HAPPY": "Feeling good." }));
}

#[test]
fn group_fields_are_skipped_and_projection_continues() {
    let file = FileDescriptorProto {
        name: Some("grp.proto".to_string()),
        package: Some("grp".to_string()),
        syntax: Some("proto2".to_string()),
        message_type: vec![DescriptorProto {
            name: Some("Outer".to_string()),
            field: vec![
                test_support::scalar_field("kept", 1, Type::String),
                test_support::typed_field("legacy", 2, Type::Group, ".grp.Outer.Legacy"),
            ],
            nested_type: vec![DescriptorProto {
                name: Some("Legacy".to_string()),
                field: vec![test_support::scalar_field("inner", 1, Type::String)],
                ..Default::default()
            }],
            ..Default::default()
        }],
        ..Default::default()
    };
    let registry = test_support::registry(vec![file]);
    let schema = project(&registry, "grp.Outer");
    let properties = schema["properties"].as_object().expect("properties object");
    assert!(properties.contains_key("kept"));
    assert!(!properties.contains_key("legacy"), "unsupported group field must be omitted");
}

#[test]
fn projection_uses_comment_index_passed_at_construction() {
    let comments = CommentIndex::new();
    let registry = test_support::registry(vec![test_support::hello_file()]);
    let projector = SchemaProjector::new(&comments);
    let schema = projector
        .project(&test_support::message(&registry, "hello.HelloRequest"))
        .expect("projection succeeds");
    assert!(schema.get("description").is_none());
}
