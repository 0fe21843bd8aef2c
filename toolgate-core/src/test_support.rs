#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    reason = "Test-only fixtures favor direct unwrap/expect for clarity."
)]

//! Shared descriptor fixtures for unit tests.

use prost_reflect::MessageDescriptor;
use prost_types::DescriptorProto;
use prost_types::EnumDescriptorProto;
use prost_types::EnumValueDescriptorProto;
use prost_types::FieldDescriptorProto;
use prost_types::FileDescriptorProto;
use prost_types::MessageOptions;
use prost_types::MethodDescriptorProto;
use prost_types::OneofDescriptorProto;
use prost_types::ServiceDescriptorProto;
use prost_types::SourceCodeInfo;
use prost_types::field_descriptor_proto::Label;
use prost_types::field_descriptor_proto::Type;
use prost_types::source_code_info::Location;

use crate::descriptor::TypeRegistry;
use crate::descriptor::registry_from_files;

/// Derives the canonical JSON name for a proto field name.
pub fn json_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for ch in name.chars() {
        if ch == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

/// Builds a singular scalar field.
pub fn scalar_field(name: &str, number: i32, kind: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(kind as i32),
        json_name: Some(json_name(name)),
        ..Default::default()
    }
}

/// Builds a singular field referencing a named message or enum type.
pub fn typed_field(name: &str, number: i32, kind: Type, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(kind as i32),
        type_name: Some(type_name.to_string()),
        json_name: Some(json_name(name)),
        ..Default::default()
    }
}

/// The `hello` package: one service, one unary method, commented sources.
pub fn hello_file() -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some("hello.proto".to_string()),
        package: Some("hello".to_string()),
        syntax: Some("proto3".to_string()),
        message_type: vec![
            DescriptorProto {
                name: Some("HelloRequest".to_string()),
                field: vec![scalar_field("name", 1, Type::String)],
                ..Default::default()
            },
            DescriptorProto {
                name: Some("HelloReply".to_string()),
                field: vec![scalar_field("message", 1, Type::String)],
                ..Default::default()
            },
        ],
        service: vec![ServiceDescriptorProto {
            name: Some("HelloService".to_string()),
            method: vec![MethodDescriptorProto {
                name: Some("SayHello".to_string()),
                input_type: Some(".hello.HelloRequest".to_string()),
                output_type: Some(".hello.HelloReply".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        }],
        source_code_info: Some(SourceCodeInfo {
            location: vec![
                Location {
                    path: vec![4, 0],
                    leading_comments: Some("The request for SayHello.".to_string()),
                    ..Default::default()
                },
                Location {
                    path: vec![4, 0, 2, 0],
                    leading_comments: Some("Caller display name.".to_string()),
                    ..Default::default()
                },
                Location {
                    path: vec![6, 0, 2, 0],
                    leading_comments: Some("Greets the caller.".to_string()),
                    trailing_comments: Some("Unary only.".to_string()),
                    ..Default::default()
                },
            ],
        }),
        ..Default::default()
    }
}

/// A deeply-packaged variant of the hello service for normalization tests.
pub fn deep_file() -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some("deep_hello.proto".to_string()),
        package: Some("com.example.hello".to_string()),
        syntax: Some("proto3".to_string()),
        message_type: vec![
            DescriptorProto {
                name: Some("Ping".to_string()),
                field: vec![scalar_field("payload", 1, Type::String)],
                ..Default::default()
            },
            DescriptorProto {
                name: Some("Pong".to_string()),
                field: vec![scalar_field("payload", 1, Type::String)],
                ..Default::default()
            },
        ],
        service: vec![ServiceDescriptorProto {
            name: Some("EchoService".to_string()),
            method: vec![MethodDescriptorProto {
                name: Some("Echo".to_string()),
                input_type: Some(".com.example.hello.Ping".to_string()),
                output_type: Some(".com.example.hello.Pong".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        }],
        ..Default::default()
    }
}

/// The `kitchen` package: every field shape the projector must handle.
pub fn kitchen_file() -> FileDescriptorProto {
    let everything = DescriptorProto {
        name: Some("Everything".to_string()),
        field: vec![
            scalar_field("flag", 1, Type::Bool),
            scalar_field("plain_int32", 2, Type::Int32),
            scalar_field("small_sint", 3, Type::Sint32),
            scalar_field("small_sfixed", 4, Type::Sfixed32),
            scalar_field("plain_int64", 5, Type::Int64),
            scalar_field("large_sint", 6, Type::Sint64),
            scalar_field("large_sfixed", 7, Type::Sfixed64),
            scalar_field("plain_uint32", 8, Type::Uint32),
            scalar_field("small_fixed", 9, Type::Fixed32),
            scalar_field("plain_uint64", 10, Type::Uint64),
            scalar_field("large_fixed", 11, Type::Fixed64),
            scalar_field("ratio", 12, Type::Float),
            scalar_field("precise_ratio", 13, Type::Double),
            scalar_field("label", 14, Type::String),
            scalar_field("blob", 15, Type::Bytes),
            typed_field("mood", 16, Type::Enum, ".kitchen.Mood"),
            FieldDescriptorProto {
                name: Some("tags".to_string()),
                number: Some(17),
                label: Some(Label::Repeated as i32),
                r#type: Some(Type::String as i32),
                json_name: Some("tags".to_string()),
                ..Default::default()
            },
            FieldDescriptorProto {
                name: Some("attrs".to_string()),
                number: Some(18),
                label: Some(Label::Repeated as i32),
                r#type: Some(Type::Message as i32),
                type_name: Some(".kitchen.Everything.AttrsEntry".to_string()),
                json_name: Some("attrs".to_string()),
                ..Default::default()
            },
            typed_field("node", 19, Type::Message, ".kitchen.Node"),
            FieldDescriptorProto {
                name: Some("stamped_at".to_string()),
                number: Some(20),
                label: Some(Label::Optional as i32),
                r#type: Some(Type::Message as i32),
                type_name: Some(".google.protobuf.Timestamp".to_string()),
                json_name: Some("stampedAt".to_string()),
                ..Default::default()
            },
            FieldDescriptorProto {
                name: Some("email".to_string()),
                number: Some(21),
                label: Some(Label::Optional as i32),
                r#type: Some(Type::String as i32),
                json_name: Some("email".to_string()),
                proto3_optional: Some(true),
                oneof_index: Some(1),
                ..Default::default()
            },
            FieldDescriptorProto {
                name: Some("either_text".to_string()),
                number: Some(22),
                label: Some(Label::Optional as i32),
                r#type: Some(Type::String as i32),
                json_name: Some("eitherText".to_string()),
                oneof_index: Some(0),
                ..Default::default()
            },
            FieldDescriptorProto {
                name: Some("either_count".to_string()),
                number: Some(23),
                label: Some(Label::Optional as i32),
                r#type: Some(Type::Int32 as i32),
                json_name: Some("eitherCount".to_string()),
                oneof_index: Some(0),
                ..Default::default()
            },
        ],
        nested_type: vec![DescriptorProto {
            name: Some("AttrsEntry".to_string()),
            field: vec![scalar_field("key", 1, Type::String), scalar_field("value", 2, Type::Int32)],
            options: Some(MessageOptions {
                map_entry: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        }],
        oneof_decl: vec![
            OneofDescriptorProto {
                name: Some("choice".to_string()),
                ..Default::default()
            },
            OneofDescriptorProto {
                name: Some("_email".to_string()),
                ..Default::default()
            },
        ],
        ..Default::default()
    };
    let node = DescriptorProto {
        name: Some("Node".to_string()),
        field: vec![
            scalar_field("value", 1, Type::String),
            typed_field("next", 2, Type::Message, ".kitchen.Node"),
        ],
        ..Default::default()
    };
    FileDescriptorProto {
        name: Some("kitchen.proto".to_string()),
        package: Some("kitchen".to_string()),
        syntax: Some("proto3".to_string()),
        dependency: vec!["google/protobuf/timestamp.proto".to_string()],
        message_type: vec![everything, node],
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
        service: vec![ServiceDescriptorProto {
            name: Some("KitchenService".to_string()),
            method: vec![
                MethodDescriptorProto {
                    name: Some("Do".to_string()),
                    input_type: Some(".kitchen.Everything".to_string()),
                    output_type: Some(".kitchen.Everything".to_string()),
                    ..Default::default()
                },
                MethodDescriptorProto {
                    name: Some("Watch".to_string()),
                    input_type: Some(".kitchen.Everything".to_string()),
                    output_type: Some(".kitchen.Everything".to_string()),
                    server_streaming: Some(true),
                    ..Default::default()
                },
            ],
            ..Default::default()
        }],
        ..Default::default()
    }
}

/// Builds a registry from fixture files.
pub fn registry(files: Vec<FileDescriptorProto>) -> TypeRegistry {
    registry_from_files(files).expect("fixture registry builds")
}

/// Looks up a message descriptor from a fixture registry.
pub fn message(registry: &TypeRegistry, name: &str) -> MessageDescriptor {
    registry.pool().get_message_by_name(name).expect("fixture message exists")
}
