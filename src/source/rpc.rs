//! Monitor RPC wire types.
//!
//! These are the request and response payloads exchanged between a running
//! user program and the resource monitor. Field names are stable: they are
//! part of the wire contract. Property maps serialize as JSON with the
//! signature-key convention so secrets, outputs, resource references,
//! assets, archives, and unknowns survive the round trip.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::property::PropertyMap;

/// A request to register a resource with the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterResourceRequest {
    /// The type token of the resource.
    #[serde(rename = "type")]
    pub ty: String,
    /// The resource's name, unique among siblings.
    pub name: String,
    /// URN of the parent resource; empty for top-level resources.
    pub parent: String,
    /// True for custom resources, false for components.
    pub custom: bool,
    /// The resource's input properties.
    pub object: PropertyMap,
    /// True if the resource should be protected from deletion.
    pub protect: bool,
    /// URNs of resources this resource depends on.
    pub dependencies: Vec<String>,
    /// Reference to the provider to use.
    pub provider: String,
    /// Output keys to additionally treat as secrets.
    pub additional_secret_outputs: Vec<String>,
    /// Previous URNs this resource was known by.
    pub aliases: Vec<String>,
    /// ID of an existing resource to import, if any.
    pub import_id: String,
    /// Property keys whose change forces a replacement.
    pub replace_on_changes: Vec<String>,
    /// Source position of the registration in the user program.
    pub source_position: String,
}

/// The engine's reply to a resource registration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterResourceResponse {
    /// URN assigned to the resource.
    pub urn: String,
    /// Provider-assigned ID; empty if not yet assigned.
    pub id: String,
    /// The resource's output properties.
    pub object: PropertyMap,
}

/// A request to read the state of an existing resource.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReadResourceRequest {
    /// The ID of the resource to read.
    pub id: String,
    /// The type token of the resource.
    #[serde(rename = "type")]
    pub ty: String,
    /// The resource's name.
    pub name: String,
    /// URN of the parent resource; empty for top-level resources.
    pub parent: String,
    /// Properties passed to the read as search parameters.
    pub properties: PropertyMap,
    /// Reference to the provider to use.
    pub provider: String,
    /// URNs of resources this read depends on.
    pub dependencies: Vec<String>,
    /// Output keys to additionally treat as secrets.
    pub additional_secret_outputs: Vec<String>,
    /// Source position of the read in the user program.
    pub source_position: String,
}

/// The engine's reply to a resource read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReadResourceResponse {
    /// URN assigned to the read resource.
    pub urn: String,
    /// The resource's properties as read.
    pub properties: PropertyMap,
}

/// A request to attach computed outputs to a registered resource.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterResourceOutputsRequest {
    /// URN of the resource the outputs belong to.
    pub urn: String,
    /// The output properties to attach.
    pub outputs: PropertyMap,
}

/// A synchronous provider function call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceInvokeRequest {
    /// The function token to invoke.
    pub tok: String,
    /// The function's arguments.
    pub args: PropertyMap,
    /// Reference to the provider to use.
    pub provider: String,
    /// Version of the provider package to use.
    pub version: String,
}

/// A single argument or property check failure reported by a provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckFailure {
    /// The property that failed the check.
    pub property: String,
    /// Why it failed.
    pub reason: String,
}

/// The provider's reply to an invoke.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InvokeResponse {
    /// The function's return properties.
    #[serde(rename = "return")]
    pub ret: PropertyMap,
    /// Argument check failures, if any.
    pub failures: Vec<CheckFailure>,
}

/// A synchronous resource method call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceCallRequest {
    /// The method token to call.
    pub tok: String,
    /// The call's arguments.
    pub args: PropertyMap,
    /// Per-argument dependency URNs.
    pub arg_dependencies: BTreeMap<String, Vec<String>>,
    /// Reference to the provider to use.
    pub provider: String,
    /// Version of the provider package to use.
    pub version: String,
}

/// The provider's reply to a call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CallResponse {
    /// The call's return properties.
    #[serde(rename = "return")]
    pub ret: PropertyMap,
    /// Per-return-property dependency URNs.
    pub return_dependencies: BTreeMap<String, Vec<String>>,
    /// Argument check failures, if any.
    pub failures: Vec<CheckFailure>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::PropertyValue;

    #[test]
    fn test_request_fields_are_stable() {
        let mut object = PropertyMap::new();
        object.insert(
            "password",
            PropertyValue::make_secret(PropertyValue::from("hunter2")),
        );

        let request = RegisterResourceRequest {
            ty: String::from("aws:s3:Bucket"),
            name: String::from("assets"),
            custom: true,
            object,
            additional_secret_outputs: vec![String::from("connectionString")],
            ..RegisterResourceRequest::default()
        };

        let encoded = serde_json::to_value(&request).expect("encodes");
        assert_eq!(encoded["type"], "aws:s3:Bucket");
        assert_eq!(encoded["additionalSecretOutputs"][0], "connectionString");
        assert_eq!(
            encoded["object"]["password"][crate::property::SIG_KEY],
            crate::property::SECRET_SIG
        );

        let decoded: RegisterResourceRequest =
            serde_json::from_value(encoded).expect("decodes");
        assert!(decoded.object.get("password").expect("present").is_secret());
    }

    #[test]
    fn test_invoke_response_return_field() {
        let response = InvokeResponse::default();
        let encoded = serde_json::to_value(&response).expect("encodes");
        assert!(encoded.get("return").is_some());
    }
}
