//! Concurrent writers and the conflict retry budget.

use k8s_openapi::api::admissionregistration::v1::ValidatingWebhookConfiguration;
use k8s_openapi::kube_aggregator::pkg::apis::apiregistration::v1::APIService;

use cabundle_sync::{Binding, Configuration, Processor, RetryConfig, TargetKind};

use crate::{
    MockCluster, STALE_BUNDLE, api_service, bundle, secret, validating_webhook_configuration,
};

fn config() -> Configuration {
    Configuration {
        api_services: vec![Binding::secret("v1.example.com", "kube-system", "ca", "ca.crt")],
        validating_webhook_configurations: vec![Binding::secret(
            "policy",
            "kube-system",
            "ca",
            "ca.crt",
        )],
        ..Default::default()
    }
}

fn cluster() -> MockCluster {
    MockCluster::new()
        .with_secret(secret("kube-system", "ca", "ca.crt", &bundle("fresh")))
        .with_target(api_service("v1.example.com"))
        .with_target(validating_webhook_configuration("policy", 2))
}

#[tokio::test]
async fn test_conflict_is_retried_with_a_fresh_read() {
    let cluster = cluster();
    cluster.simulate_concurrent_writes(TargetKind::ApiService, "v1.example.com", 2);

    let processor = Processor::new(cluster).with_retry(RetryConfig::immediate(3));
    processor.run(&config()).await.unwrap();

    let cluster = processor.cluster();
    assert_eq!(cluster.replace_count(TargetKind::ApiService, "v1.example.com"), 3);
    assert_eq!(
        cluster.bundles::<APIService>("v1.example.com"),
        vec![Some(bundle("fresh"))]
    );
}

#[tokio::test]
async fn test_persistent_conflict_exhausts_the_budget() {
    let cluster = cluster();
    cluster.simulate_concurrent_writes(TargetKind::ApiService, "v1.example.com", 10);

    let processor = Processor::new(cluster).with_retry(RetryConfig::immediate(4));
    let err = processor.run(&config()).await.unwrap_err();

    assert_eq!(err.len(), 1);
    assert!(err.failures()[0].error.is_conflict());

    let cluster = processor.cluster();
    assert_eq!(cluster.replace_count(TargetKind::ApiService, "v1.example.com"), 4);
    assert_eq!(
        cluster.bundles::<APIService>("v1.example.com"),
        vec![Some(STALE_BUNDLE.to_vec())]
    );
    // The other binding is unaffected
    assert_eq!(
        cluster.bundles::<ValidatingWebhookConfiguration>("policy"),
        vec![Some(bundle("fresh")); 2]
    );
}

#[tokio::test]
async fn test_single_attempt_reports_the_conflict() {
    let cluster = cluster();
    cluster.simulate_concurrent_writes(TargetKind::ValidatingWebhookConfiguration, "policy", 1);

    let processor = Processor::new(cluster).with_retry(RetryConfig::no_retry());
    let err = processor.run(&config()).await.unwrap_err();

    assert_eq!(err.len(), 1);
    assert_eq!(err.failures()[0].kind, TargetKind::ValidatingWebhookConfiguration);
    assert!(err.to_string().contains("modified concurrently"));
    assert_eq!(
        processor
            .cluster()
            .replace_count(TargetKind::ValidatingWebhookConfiguration, "policy"),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn test_default_budget_backs_off_between_attempts() {
    let cluster = cluster();
    cluster.simulate_concurrent_writes(TargetKind::ApiService, "v1.example.com", 1);

    let processor = Processor::new(cluster);
    processor.run(&config()).await.unwrap();

    assert_eq!(
        processor
            .cluster()
            .replace_count(TargetKind::ApiService, "v1.example.com"),
        2
    );
}
