//! Mock-based tests for the network client.
//!
//! # API Structure
//!
//! - VNets: `/subscriptions/{sub}/resourceGroups/{rg}/providers/Microsoft.Network/virtualNetworks/{name}`
//! - Subnets: `.../virtualNetworks/{vnet}/subnets/{name}`
//! - api-version `2018-08-01`

use crate::common::network::*;
use crate::common::*;

use azure_aci::network::{Client, Subnet, VirtualNetwork, CONTAINER_GROUP_SERVICE};
use azure_aci::RetryConfig;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GROUP: &str = "rg-net";

fn client(server: &MockServer) -> Client {
    Client::new(test_auth(&server.uri()), "unit-test", RetryConfig::none())
        .expect("Failed to create client")
}

#[tokio::test]
async fn test_create_vnet() {
    let server = setup_mock_server().await;
    mount_token(&server).await;

    Mock::given(method("PUT"))
        .and(path(vnet_path(GROUP, "vnet1")))
        .and(query_param("api-version", "2018-08-01"))
        .and(body_partial_json(json!({
            "location": "westus",
            "properties": { "addressSpace": { "addressPrefixes": ["10.0.0.0/16"] } }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(mock_vnet_response(
            GROUP,
            "vnet1",
            vec!["10.0.0.0/16"],
        )))
        .expect(1)
        .mount(&server)
        .await;

    let vnet = VirtualNetwork::new("vnet1", "westus", vec!["10.0.0.0/16".into()]);
    let created = client(&server)
        .create_or_update_vnet(GROUP, &vnet)
        .await
        .expect("Failed to create vnet");

    assert_eq!(created.name, "vnet1");
    assert_eq!(
        created.properties.address_space.address_prefixes,
        vec!["10.0.0.0/16".to_string()]
    );
    assert_eq!(created.properties.provisioning_state.as_deref(), Some("Succeeded"));
}

#[tokio::test]
async fn test_get_vnet_not_found() {
    let server = setup_mock_server().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path(vnet_path(GROUP, "nope")))
        .respond_with(ResponseTemplate::new(404).set_body_json(mock_error_response(
            "ResourceNotFound",
            "The Resource 'Microsoft.Network/virtualNetworks/nope' was not found.",
        )))
        .mount(&server)
        .await;

    let err = client(&server).get_vnet(GROUP, "nope").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_delete_vnet() {
    let server = setup_mock_server().await;
    mount_token(&server).await;

    Mock::given(method("DELETE"))
        .and(path(vnet_path(GROUP, "vnet1")))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .delete_vnet(GROUP, "vnet1")
        .await
        .expect("Failed to delete vnet");
}

#[tokio::test]
async fn test_create_delegated_subnet() {
    let server = setup_mock_server().await;
    mount_token(&server).await;

    Mock::given(method("PUT"))
        .and(path(subnet_path(GROUP, "vnet1", "aci")))
        .and(body_partial_json(json!({
            "properties": {
                "addressPrefix": "10.0.1.0/24",
                "delegations": [{ "properties": { "serviceName": CONTAINER_GROUP_SERVICE } }]
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_subnet_response(
            GROUP,
            "vnet1",
            "aci",
            "10.0.1.0/24",
            Some(CONTAINER_GROUP_SERVICE),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let subnet = Subnet::new("aci", "10.0.1.0/24").with_delegation("aciDelegation", CONTAINER_GROUP_SERVICE);
    let created = client(&server)
        .create_or_update_subnet(GROUP, "vnet1", &subnet)
        .await
        .expect("Failed to create subnet");

    assert_eq!(created.properties.address_prefix, "10.0.1.0/24");
    assert!(created.is_delegated_to(CONTAINER_GROUP_SERVICE));
}

#[tokio::test]
async fn test_get_subnet() {
    let server = setup_mock_server().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path(subnet_path(GROUP, "vnet1", "plain")))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_subnet_response(
            GROUP,
            "vnet1",
            "plain",
            "10.0.2.0/24",
            None,
        )))
        .mount(&server)
        .await;

    let subnet = client(&server)
        .get_subnet(GROUP, "vnet1", "plain")
        .await
        .expect("Failed to get subnet");

    assert_eq!(subnet.name, "plain");
    assert!(!subnet.is_delegated_to(CONTAINER_GROUP_SERVICE));
    assert!(subnet.id.unwrap().ends_with("/subnets/plain"));
}
