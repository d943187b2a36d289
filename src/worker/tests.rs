//! Worker Module Tests
//!
//! ## Test Scopes
//! - **Failover rules**: Candidate selection, promotion vs deference, fleet exhaustion,
//!   and the split-brain weakness when snapshots diverge.
//! - **Node lifecycle**: Founding a fleet, joining it, sharing load, promotion after the
//!   coordinator dies, deference to another candidate, and rejoin after expiry.
//!   These run real coordinators on loopback ports, plus a silent listener for the
//!   timeout path.
//! - **Load limits**: Oversized totals are refused or leave the previous buffer in place.
//! - **Worker API**: Proxies and the metrics report.

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::error::FleetError;
    use crate::membership::types::{InstanceId, InstanceRecord};
    use crate::worker::client::CoordinatorClient;
    use crate::worker::failover::{FailoverDecision, plan_failover, select_candidate};
    use crate::worker::handlers::router;
    use crate::worker::metrics::report_metrics;
    use crate::worker::node::{LocalView, Role, WorkerNode};
    use crate::workload::types::WorkloadSpec;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use std::time::Duration;
    use tower::ServiceExt;

    const MIB: usize = 1024 * 1024;

    fn free_port() -> u16 {
        std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port()
    }

    fn local(port: u16) -> String {
        format!("127.0.0.1:{}", port)
    }

    fn test_config(coordinator_port: u16, bootstrap_address: String) -> Config {
        Config {
            host: "127.0.0.1".to_string(),
            worker_port: 0,
            coordinator_port,
            bootstrap_address,
            initial_total_mib: 4,
            poll_interval_ms: 10,
            monitor_interval_ms: 60_000,
            expiry_ms: 120_000,
            settle_interval_ms: 10,
            request_timeout_ms: 500,
            connect_timeout_ms: 200,
        }
    }

    fn record(id: &str, port: u16) -> InstanceRecord {
        InstanceRecord {
            id: InstanceId(id.to_string()),
            address: local(port),
            last_seen: None,
        }
    }

    async fn found_fleet() -> (WorkerNode, u16) {
        let port = free_port();
        let config = test_config(port, local(free_port()));
        let node = WorkerNode::join(config, local(port)).await.unwrap();
        assert!(node.is_coordinator());
        (node, port)
    }

    async fn join_fleet(coordinator_port: u16) -> (WorkerNode, u16) {
        let port = free_port();
        let config = test_config(port, local(coordinator_port));
        let node = WorkerNode::join(config, local(port)).await.unwrap();
        assert!(!node.is_coordinator());
        (node, port)
    }

    async fn kill(node: &WorkerNode) {
        node.coordinator_handle().unwrap().abort();
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    // ============================================================
    // FAILOVER RULE TESTS
    // ============================================================

    #[test]
    fn test_single_member_cache_is_exhausted() {
        let members = vec![record("coordinator", 1)];

        let result = plan_failover(&members, &InstanceId("w1".to_string()));

        assert!(matches!(result, Err(FleetError::FleetExhausted)));
    }

    #[test]
    fn test_candidate_promotes_itself() {
        let members = vec![record("coordinator", 1), record("w1", 2), record("w2", 3)];

        let decision = plan_failover(&members, &InstanceId("w1".to_string())).unwrap();

        match decision {
            FailoverDecision::Promote { members } => {
                assert_eq!(members.len(), 2);
                assert!(members[0].id.is_coordinator());
                assert_eq!(members[0].address, local(2));
                assert_eq!(members[1].id.0, "w2");
            }
            other => panic!("Expected promotion, got {:?}", other),
        }
    }

    #[test]
    fn test_non_candidate_defers_and_relabels() {
        let members = vec![record("coordinator", 1), record("w1", 2), record("w2", 3)];

        let decision = plan_failover(&members, &InstanceId("w2".to_string())).unwrap();

        match &decision {
            FailoverDecision::Defer { candidate, members } => {
                assert_eq!(candidate.0, "w1");
                assert!(members[0].id.is_coordinator());
                assert_eq!(members[0].address, local(2));
            }
            other => panic!("Expected deference, got {:?}", other),
        }
        assert_eq!(decision.members().len(), 2);
    }

    #[test]
    fn test_identical_snapshots_agree_on_candidate() {
        let members = vec![
            record("coordinator", 1),
            record("w-a", 2),
            record("w-b", 3),
            record("w-c", 4),
        ];

        let seen_by_b = select_candidate(&members.clone()).unwrap();
        let seen_by_c = select_candidate(&members).unwrap();

        assert_eq!(seen_by_b, seen_by_c);
        assert_eq!(seen_by_b.0, "w-a");

        let promoters = ["w-a", "w-b", "w-c"]
            .iter()
            .filter(|id| {
                matches!(
                    plan_failover(&members, &InstanceId(id.to_string())),
                    Ok(FailoverDecision::Promote { .. })
                )
            })
            .count();
        assert_eq!(promoters, 1, "Exactly one worker promotes itself");
    }

    #[test]
    fn test_coordinator_record_removed_even_when_not_in_front() {
        let members = vec![record("w1", 2), record("coordinator", 1), record("w2", 3)];

        let candidate = select_candidate(&members).unwrap();

        assert_eq!(candidate.0, "w1");
    }

    #[test]
    fn test_front_dropped_when_no_coordinator_is_labeled() {
        let members = vec![record("w1", 2), record("w2", 3)];

        let decision = plan_failover(&members, &InstanceId("w2".to_string())).unwrap();

        assert!(matches!(decision, FailoverDecision::Promote { .. }));
    }

    #[test]
    fn test_diverged_snapshots_can_split_brain() {
        // Known limitation: without a quorum, workers whose snapshots differ
        // (e.g. w1 missed w2's view of the fleet) may both take over.
        let seen_by_w1 = vec![record("coordinator", 1), record("w1", 2), record("w2", 3)];
        let seen_by_w2 = vec![record("coordinator", 1), record("w2", 3), record("w1", 2)];

        let w1 = plan_failover(&seen_by_w1, &InstanceId("w1".to_string())).unwrap();
        let w2 = plan_failover(&seen_by_w2, &InstanceId("w2".to_string())).unwrap();

        assert!(matches!(w1, FailoverDecision::Promote { .. }));
        assert!(matches!(w2, FailoverDecision::Promote { .. }));
    }

    // ============================================================
    // NODE LIFECYCLE TESTS
    // ============================================================

    #[tokio::test]
    async fn test_unreachable_bootstrap_founds_fleet() {
        let (mut node, port) = found_fleet().await;

        node.poll_once().await.unwrap();

        let view = node.view().read().await.clone();
        assert!(view.self_id.is_coordinator());
        assert_eq!(view.members.len(), 1);
        assert_eq!(view.coordinator_address(), Some(local(port).as_str()));
        assert_eq!(view.workload, WorkloadSpec::new(4));
        assert_eq!(node.load_bytes(), 4 * MIB);

        kill(&node).await;
    }

    #[tokio::test]
    async fn test_second_instance_halves_the_chunk() {
        let (mut a, a_port) = found_fleet().await;
        let (mut b, _) = join_fleet(a_port).await;

        b.poll_once().await.unwrap();
        a.poll_once().await.unwrap();

        assert_eq!(a.view().read().await.workload.chunk_size, 2);
        assert_eq!(b.view().read().await.workload.chunk_size, 2);
        assert_eq!(b.load_bytes(), 2 * MIB);
        assert_eq!(a.load_bytes(), 2 * MIB);

        kill(&a).await;
    }

    #[tokio::test]
    async fn test_worker_promotes_itself_when_coordinator_dies() {
        let (a, a_port) = found_fleet().await;
        let (mut b, b_port) = join_fleet(a_port).await;
        b.poll_once().await.unwrap();

        kill(&a).await;
        b.poll_once().await.unwrap();

        assert!(b.is_coordinator());
        let view = b.view().read().await.clone();
        assert!(view.self_id.is_coordinator());
        assert_eq!(view.coordinator_address(), Some(local(b_port).as_str()));

        // Survivor runs the worker role against itself and gets the whole total.
        b.poll_once().await.unwrap();
        assert_eq!(b.view().read().await.workload.chunk_size, 4);
        assert_eq!(b.load_bytes(), 4 * MIB);

        kill(&b).await;
    }

    #[tokio::test]
    async fn test_other_worker_defers_to_candidate() {
        let (a, a_port) = found_fleet().await;
        let (mut b, b_port) = join_fleet(a_port).await;
        let (mut c, _) = join_fleet(a_port).await;
        b.poll_once().await.unwrap();
        c.poll_once().await.unwrap();
        let c_id = c.view().read().await.self_id.clone();

        kill(&a).await;

        c.poll_once().await.unwrap();
        assert!(!c.is_coordinator());
        assert_eq!(
            c.view().read().await.coordinator_address(),
            Some(local(b_port).as_str())
        );

        b.poll_once().await.unwrap();
        assert!(b.is_coordinator());

        c.poll_once().await.unwrap();
        let view = c.view().read().await.clone();
        assert_eq!(view.self_id, c_id, "Inherited membership keeps c's id");
        assert_eq!(view.members.len(), 2);
        assert_eq!(view.workload.chunk_size, 2);

        kill(&b).await;
    }

    #[tokio::test]
    async fn test_last_instance_losing_coordinator_is_fatal() {
        let dead = free_port();
        let port = free_port();
        let config = test_config(port, local(dead));
        let client =
            CoordinatorClient::new(config.request_timeout(), config.connect_timeout()).unwrap();
        let view = LocalView {
            self_id: InstanceId("lonely".to_string()),
            members: vec![record("coordinator", dead)],
            workload: WorkloadSpec::new(4),
        };
        let mut node = WorkerNode::new(config, local(port), view, Role::Worker, client);

        let result = node.poll_once().await;

        assert!(matches!(result, Err(FleetError::FleetExhausted)));
    }

    #[tokio::test]
    async fn test_expired_worker_rejoins() {
        let (a, a_port) = found_fleet().await;
        let (mut b, _) = join_fleet(a_port).await;
        b.poll_once().await.unwrap();
        let old_id = b.view().read().await.self_id.clone();

        let state = a.coordinator_handle().unwrap().state.clone();
        state.remove_at(1).await.unwrap();
        assert_eq!(state.instance_count().await, 1);

        b.poll_once().await.unwrap();

        let view = b.view().read().await.clone();
        assert_ne!(view.self_id, old_id);
        assert!(view.contains(&view.self_id));
        assert_eq!(state.instance_count().await, 2);
        assert_eq!(view.workload.chunk_size, 2);

        kill(&a).await;
    }

    #[tokio::test]
    async fn test_oversized_total_never_stops_the_fleet() {
        let (mut a, a_port) = found_fleet().await;
        let (mut b, _) = join_fleet(a_port).await;
        a.poll_once().await.unwrap();
        b.poll_once().await.unwrap();
        let state = a.coordinator_handle().unwrap().state.clone();

        let result = state.set_total("18446744073709551615").await;
        assert!(matches!(result, Err(FleetError::InvalidTotal { .. })));
        assert_eq!(state.workload().await.total_size, 4);

        // Addressable, yet far beyond what any host can reserve.
        let huge = (isize::MAX as usize / MIB) as u64;
        state.set_total(&huge.to_string()).await.unwrap();

        a.poll_once().await.unwrap();
        b.poll_once().await.unwrap();

        assert!(a.is_coordinator());
        assert_eq!(a.view().read().await.workload.total_size, huge);
        assert_eq!(b.view().read().await.workload.chunk_size, huge / 2);
        assert_eq!(a.load_bytes(), 2 * MIB, "Previous buffer is kept");
        assert_eq!(b.load_bytes(), 2 * MIB, "Previous buffer is kept");

        state.set_total("8").await.unwrap();
        b.poll_once().await.unwrap();
        assert_eq!(b.load_bytes(), 4 * MIB);

        kill(&a).await;
    }

    #[tokio::test]
    async fn test_silent_coordinator_times_out_into_failover() {
        let silent = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let silent_port = silent.local_addr().unwrap().port();
        let holder = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = silent.accept().await {
                held.push(socket);
            }
        });

        let port = free_port();
        let config = test_config(port, local(silent_port));
        let request_timeout = config.request_timeout();
        let client =
            CoordinatorClient::new(config.request_timeout(), config.connect_timeout()).unwrap();
        let view = LocalView {
            self_id: InstanceId("w1".to_string()),
            members: vec![record("coordinator", silent_port), record("w1", port)],
            workload: WorkloadSpec::new(4),
        };
        let mut node = WorkerNode::new(config, local(port), view, Role::Worker, client);

        let started = tokio::time::Instant::now();
        node.poll_once().await.unwrap();
        let elapsed = started.elapsed();

        assert!(node.is_coordinator(), "Timeout counts as unreachable");
        assert!(elapsed >= request_timeout);
        assert!(elapsed < request_timeout * 4);
        assert_eq!(
            node.view().read().await.coordinator_address(),
            Some(local(port).as_str())
        );

        kill(&node).await;
        holder.abort();
    }

    // ============================================================
    // WORKER API TESTS
    // ============================================================

    #[tokio::test]
    async fn test_set_total_is_proxied_to_coordinator() {
        let (a, a_port) = found_fleet().await;
        let app = router(a.view(), a.client(), a_port);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/set?mem=10")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let spec: WorkloadSpec = serde_json::from_slice(&body).unwrap();
        assert_eq!(spec, WorkloadSpec::new(10));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/set?mem=abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let state = a.coordinator_handle().unwrap().state.clone();
        assert_eq!(state.workload().await.total_size, 10);

        kill(&a).await;
    }

    #[tokio::test]
    async fn test_register_is_proxied_and_metrics_reflect_it() {
        let (mut a, a_port) = found_fleet().await;
        let app = router(a.view(), a.client(), a_port);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/register")
                    .header("content-type", "application/json")
                    .body(Body::from(format!(r#"{{"address":"{}"}}"#, local(9))))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        a.poll_once().await.unwrap();

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();

        assert_eq!(text, "instances_count 2\nworkload_mib 4\nchunksize_mib 2\n");

        kill(&a).await;
    }

    #[tokio::test]
    async fn test_client_set_total_reports_validation_errors() {
        let (a, a_port) = found_fleet().await;
        let client = a.client();

        let spec = client.set_total(&local(a_port), "8").await.unwrap();
        assert_eq!(spec, WorkloadSpec::new(8));

        let err = client.set_total(&local(a_port), "eight").await.unwrap_err();
        assert!(matches!(
            err,
            FleetError::CoordinatorStatus { status: 400, .. }
        ));

        kill(&a).await;
    }

    #[tokio::test]
    async fn test_proxy_to_dead_coordinator_is_bad_gateway() {
        let dead = free_port();
        let view = LocalView {
            self_id: InstanceId("w1".to_string()),
            members: vec![record("coordinator", dead), record("w1", free_port())],
            workload: WorkloadSpec::new(4),
        };
        let client =
            CoordinatorClient::new(Duration::from_millis(500), Duration::from_millis(200)).unwrap();
        let app = router(
            std::sync::Arc::new(tokio::sync::RwLock::new(view)),
            client,
            dead,
        );

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/set?mem=10")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_metrics_report_format() {
        let view = LocalView {
            self_id: InstanceId::coordinator(),
            members: vec![record("coordinator", 1), record("w1", 2), record("w2", 3)],
            workload: WorkloadSpec {
                total_size: 100,
                chunk_size: 33,
            },
        };

        assert_eq!(
            report_metrics(&view),
            "instances_count 3\nworkload_mib 100\nchunksize_mib 33\n"
        );
    }
}
