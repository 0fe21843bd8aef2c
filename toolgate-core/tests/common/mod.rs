#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    dead_code,
    reason = "Shared test fixtures favor direct unwrap/expect for clarity."
)]

//! Descriptor fixtures shared by the integration suites.

use prost_types::DescriptorProto;
use prost_types::FieldDescriptorProto;
use prost_types::FileDescriptorProto;
use prost_types::FileDescriptorSet;
use prost_types::MethodDescriptorProto;
use prost_types::ServiceDescriptorProto;
use prost_types::field_descriptor_proto::Label;
use prost_types::field_descriptor_proto::Type;

/// Builds a singular string field.
pub fn string_field(name: &str, number: i32) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(Type::String as i32),
        json_name: Some(name.to_string()),
        ..Default::default()
    }
}

/// The `hello` package as the backend would expose it over reflection:
/// one unary method, no source info.
pub fn hello_file() -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some("hello.proto".to_string()),
        package: Some("hello".to_string()),
        syntax: Some("proto3".to_string()),
        message_type: vec![
            DescriptorProto {
                name: Some("HelloRequest".to_string()),
                field: vec![string_field("name", 1)],
                ..Default::default()
            },
            DescriptorProto {
                name: Some("HelloReply".to_string()),
                field: vec![string_field("message", 1)],
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
        ..Default::default()
    }
}

/// A self-referential list node with a unary and a streaming method.
pub fn node_file() -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some("node.proto".to_string()),
        package: Some("cycle".to_string()),
        syntax: Some("proto3".to_string()),
        message_type: vec![DescriptorProto {
            name: Some("Node".to_string()),
            field: vec![
                string_field("v", 1),
                FieldDescriptorProto {
                    name: Some("next".to_string()),
                    number: Some(2),
                    label: Some(Label::Optional as i32),
                    r#type: Some(Type::Message as i32),
                    type_name: Some(".cycle.Node".to_string()),
                    json_name: Some("next".to_string()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        }],
        service: vec![ServiceDescriptorProto {
            name: Some("NodeService".to_string()),
            method: vec![
                MethodDescriptorProto {
                    name: Some("Touch".to_string()),
                    input_type: Some(".cycle.Node".to_string()),
                    output_type: Some(".cycle.Node".to_string()),
                    ..Default::default()
                },
                MethodDescriptorProto {
                    name: Some("Tail".to_string()),
                    input_type: Some(".cycle.Node".to_string()),
                    output_type: Some(".cycle.Node".to_string()),
                    server_streaming: Some(true),
                    ..Default::default()
                },
            ],
            ..Default::default()
        }],
        ..Default::default()
    }
}

/// A fixture standing in for the standard health service.
pub fn health_file() -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some("health.proto".to_string()),
        package: Some("grpc.health.v1".to_string()),
        syntax: Some("proto3".to_string()),
        message_type: vec![
            DescriptorProto {
                name: Some("HealthCheckRequest".to_string()),
                field: vec![string_field("service", 1)],
                ..Default::default()
            },
            DescriptorProto {
                name: Some("HealthCheckResponse".to_string()),
                field: vec![string_field("status", 1)],
                ..Default::default()
            },
        ],
        service: vec![ServiceDescriptorProto {
            name: Some("Health".to_string()),
            method: vec![MethodDescriptorProto {
                name: Some("Check".to_string()),
                input_type: Some(".grpc.health.v1.HealthCheckRequest".to_string()),
                output_type: Some(".grpc.health.v1.HealthCheckResponse".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        }],
        ..Default::default()
    }
}

/// Bundles fixtures into a descriptor set.
pub fn descriptor_set(files: Vec<FileDescriptorProto>) -> FileDescriptorSet {
    FileDescriptorSet {
        file: files,
    }
}
