// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

//! Property-based tests for cabundle-sync.
//!
//! Uses proptest to generate random configurations and verify invariants.

#[path = "../common/mod.rs"]
mod common;

use k8s_openapi::api::admissionregistration::v1::ValidatingWebhookConfiguration;
use k8s_openapi::kube_aggregator::pkg::apis::apiregistration::v1::APIService;
use proptest::prelude::*;

use cabundle_sync::{Binding, Configuration, Processor, RetryConfig};

use common::fixtures::{STALE_BUNDLE, api_service, secret, validating_webhook_configuration};
use common::mock_cluster::MockCluster;

/// How a generated binding is set up to behave.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Plan {
    Succeeds,
    MissingTarget,
    MissingKey,
    EmptyName,
}

impl Plan {
    fn fails(self) -> bool {
        self != Plan::Succeeds
    }
}

fn any_plan() -> impl Strategy<Value = Plan> {
    prop_oneof![
        3 => Just(Plan::Succeeds),
        1 => Just(Plan::MissingTarget),
        1 => Just(Plan::MissingKey),
        1 => Just(Plan::EmptyName),
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

/// Build a cluster and an APIService-only configuration following `plans`.
fn setup(plans: &[Plan], bundle: &[u8]) -> (MockCluster, Configuration) {
    let mut cluster =
        MockCluster::new().with_secret(secret("kube-system", "ca", "ca.crt", bundle));
    let mut bindings = Vec::with_capacity(plans.len());

    for (i, plan) in plans.iter().enumerate() {
        let name = format!("v1.svc{i}.example.com");
        if *plan != Plan::MissingTarget {
            cluster = cluster.with_target(api_service(&name));
        }
        let binding = match plan {
            Plan::Succeeds | Plan::MissingTarget => {
                Binding::secret(&name, "kube-system", "ca", "ca.crt")
            }
            Plan::MissingKey => Binding::secret(&name, "kube-system", "ca", "absent"),
            Plan::EmptyName => Binding::secret("", "kube-system", "ca", "ca.crt"),
        };
        bindings.push(binding);
    }

    let config = Configuration {
        api_services: bindings,
        ..Default::default()
    };
    (cluster, config)
}

proptest! {
    /// N bindings with M failing: exactly M messages, and the other N - M
    /// targets carry the resolved bundle.
    #[test]
    fn prop_failures_are_isolated_and_counted(
        plans in prop::collection::vec(any_plan(), 0..12),
        bundle in prop::collection::vec(any::<u8>(), 1..256),
    ) {
        let (cluster, config) = setup(&plans, &bundle);
        let processor = Processor::new(cluster).with_retry(RetryConfig::no_retry());
        let result = runtime().block_on(processor.run(&config));

        let expected_failures = plans.iter().filter(|p| p.fails()).count();
        match result {
            Ok(()) => prop_assert_eq!(expected_failures, 0),
            Err(err) => {
                prop_assert_eq!(err.len(), expected_failures);
                prop_assert_eq!(err.messages().len(), expected_failures);
            }
        }

        for (i, plan) in plans.iter().enumerate() {
            let name = format!("v1.svc{i}.example.com");
            let bundles = processor.cluster().bundles::<APIService>(&name);
            match plan {
                Plan::Succeeds => prop_assert_eq!(bundles, vec![Some(bundle.clone())]),
                Plan::MissingTarget => prop_assert!(bundles.is_empty()),
                Plan::MissingKey | Plan::EmptyName => {
                    prop_assert_eq!(bundles, vec![Some(STALE_BUNDLE.to_vec())])
                }
            }
        }
    }

    /// Applying the same bundle any number of times equals applying it once.
    #[test]
    fn prop_apply_is_idempotent(
        bundle in prop::collection::vec(any::<u8>(), 1..256),
        hooks in 0usize..5,
        passes in 1usize..4,
    ) {
        let cluster = MockCluster::new()
            .with_secret(secret("kube-system", "ca", "ca.crt", &bundle))
            .with_target(validating_webhook_configuration("policy", hooks));
        let config = Configuration {
            validating_webhook_configurations: vec![
                Binding::secret("policy", "kube-system", "ca", "ca.crt"),
            ],
            ..Default::default()
        };
        let processor = Processor::new(cluster).with_retry(RetryConfig::no_retry());
        let rt = runtime();

        for _ in 0..passes {
            rt.block_on(processor.run(&config)).unwrap();
        }

        let bundles = processor
            .cluster()
            .bundles::<ValidatingWebhookConfiguration>("policy");
        prop_assert_eq!(bundles, vec![Some(bundle.clone()); hooks]);
    }
}
