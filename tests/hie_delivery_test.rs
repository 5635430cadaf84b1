//! End-to-end transform and delivery against a mock HIE

mod common;

use common::*;
use hie_bridge::adapters::hie::HieClient;
use hie_bridge::config::{secret_string, HieConfig, RetryConfig};
use hie_bridge::core::delivery::deliver;
use hie_bridge::core::mapping::IdentityMappingService;
use hie_bridge::core::transform::{ConceptSets, FhirTransformer, RegistryUrls};
use hie_bridge::domain::BridgeError;
use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn hie_config(server: &ServerGuard) -> HieConfig {
    let url = server.url();
    HieConfig {
        shr_url: format!("{url}/shr"),
        mirror_urls: vec![],
        mapping_url: format!("{url}/mappings"),
        client_registry_url: CLIENT_REGISTRY.to_string(),
        health_worker_registry_url: HEALTH_WORKER_REGISTRY.to_string(),
        facility_registry_url: FACILITY_REGISTRY.to_string(),
        token_url: format!("{url}/token"),
        client_id: "amrs".to_string(),
        client_secret: secret_string("secret".to_string()),
        timeout_seconds: 5,
        token_refresh_margin_seconds: 60,
        mapping_cache_ttl_seconds: 3600,
        mapping_cache_capacity: 100,
        dead_letter_url: None,
        tls_verify: true,
        retry: RetryConfig {
            max_retries: 0,
            initial_delay_ms: 1,
            max_delay_ms: 1,
            backoff_multiplier: 1.0,
        },
    }
}

fn pipeline(client: Arc<HieClient>) -> FhirTransformer {
    let mapping = Arc::new(IdentityMappingService::new(
        client,
        Duration::from_secs(3600),
        100,
    ));
    FhirTransformer::new(
        mapping,
        RegistryUrls {
            client_registry: CLIENT_REGISTRY.to_string(),
            health_worker_registry: HEALTH_WORKER_REGISTRY.to_string(),
            facility_registry: FACILITY_REGISTRY.to_string(),
        },
        ConceptSets::default(),
    )
}

async fn mapping_mock(server: &mut ServerGuard, kind: &str, local: &str, remote: &str) -> Mock {
    server
        .mock("POST", format!("/mappings/{kind}").as_str())
        .match_header("authorization", "Bearer tok")
        .match_body(Matcher::Json(json!({ "ids": [local] })))
        .with_status(200)
        .with_body(json!({"mappings": [{"localId": local, "remoteId": remote}]}).to_string())
        .expect(1)
        .create_async()
        .await
}

#[tokio::test]
async fn test_mappings_and_token_are_reused_across_visits() {
    let mut server = Server::new_async().await;
    let token = server
        .mock("POST", "/token")
        .with_status(200)
        .with_body(r#"{"access_token":"tok","expires_in":3600}"#)
        .expect(1)
        .create_async()
        .await;
    let patient = mapping_mock(&mut server, "patient", "patientA", "CR-A").await;
    let practitioner = mapping_mock(&mut server, "practitioner", "prov-1", "HWR-1").await;
    let facility = mapping_mock(&mut server, "facility", "loc-1", "FR-1").await;
    let shr = server
        .mock("POST", "/shr")
        .match_header("authorization", "Bearer tok")
        .match_header("content-type", "application/fhir+json")
        .match_body(Matcher::PartialJson(json!({"resourceType": "Bundle", "type": "collection"})))
        .with_status(201)
        .expect(2)
        .create_async()
        .await;

    let client = Arc::new(HieClient::new(hie_config(&server)).unwrap());
    let transformer = pipeline(client.clone());

    for visit_id in ["v1", "v2"] {
        let bundle = transformer
            .transform(&scenario_dataset("patientA", visit_id))
            .await
            .unwrap();
        let json = bundle_json(&bundle);
        assert_eq!(
            json["entry"][0]["resource"]["subject"]["reference"],
            "https://hie.test/cr/Patient/CR-A"
        );
        assert_eq!(deliver(client.as_ref(), &bundle).await.unwrap(), 201);
    }

    token.assert_async().await;
    patient.assert_async().await;
    practitioner.assert_async().await;
    facility.assert_async().await;
    shr.assert_async().await;
}

#[tokio::test]
async fn test_rejected_bundle_surfaces_status_and_body() {
    let mut server = Server::new_async().await;
    let _token = server
        .mock("POST", "/token")
        .with_status(200)
        .with_body(r#"{"access_token":"tok","expires_in":3600}"#)
        .create_async()
        .await;
    let _mappings = server
        .mock("POST", Matcher::Regex(r"^/mappings/".to_string()))
        .with_status(200)
        .with_body(r#"{"mappings":[]}"#)
        .create_async()
        .await;
    let _shr = server
        .mock("POST", "/shr")
        .with_status(422)
        .with_body("Encounter.subject is required")
        .create_async()
        .await;

    let client = Arc::new(HieClient::new(hie_config(&server)).unwrap());
    let bundle = pipeline(client.clone())
        .transform(&scenario_dataset("patientA", "v1"))
        .await
        .unwrap();

    let err = deliver(client.as_ref(), &bundle).await.unwrap_err();

    assert!(!err.is_retryable());
    match err {
        BridgeError::Delivery { status, message } => {
            assert_eq!(status, Some(422));
            assert!(message.contains("Encounter.subject is required"));
        }
        other => panic!("unexpected error: {other}"),
    }
}
