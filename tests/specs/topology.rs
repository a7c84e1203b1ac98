// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Topology scenarios: chains, fan-out, updates, selector cycles.

use crate::prelude::*;

#[tokio::test(start_paused = true)]
async fn linear_chain_wires_and_achieves() {
    let rec = orchestrator();
    rec.start();
    rec.submit_add(vec![
        want("alpha", "source").label("r", "p").build(),
        want("beta", "relay").label("r", "proc").using(&[("r", "p")]).build(),
        want("gamma", "sink").label("r", "sink").using(&[("r", "proc")]).build(),
    ]);

    let handle = rec.handle();
    assert!(wait_all_achieved(&handle, &["alpha", "beta", "gamma"]).await);

    let beta = handle.get("beta").unwrap();
    let beta_paths = beta.paths();
    assert_eq!(beta_paths.inputs.len(), 1);
    assert_eq!(beta_paths.inputs[0].peer, "alpha");

    let gamma = handle.get("gamma").unwrap();
    let gamma_paths = gamma.paths();
    assert_eq!(gamma_paths.inputs.len(), 1);
    assert_eq!(gamma_paths.inputs[0].peer, "beta");

    let alpha = handle.get("alpha").unwrap();
    assert!(alpha.paths().outputs[0].edge.same_channel(&beta_paths.inputs[0].edge));

    assert_unique_ids(&handle);
    assert_channel_symmetry(&handle);
    rec.shutdown();
}

#[tokio::test(start_paused = true)]
async fn fan_out_uses_distinct_channels() {
    let rec = orchestrator();
    rec.start();
    rec.submit_add(vec![
        want("alpha", "source").label("r", "p").build(),
        want("left", "sink").using(&[("r", "p")]).build(),
        want("right", "sink").using(&[("r", "p")]).build(),
    ]);

    let handle = rec.handle();
    assert!(wait_all_achieved(&handle, &["alpha", "left", "right"]).await);

    let outs = handle.get("alpha").unwrap().paths().outputs;
    assert_eq!(outs.len(), 2);
    assert!(!outs[0].edge.same_channel(&outs[1].edge));
    assert_channel_symmetry(&handle);
    rec.shutdown();
}

#[tokio::test(start_paused = true)]
async fn update_preserves_inflight_buffers_on_surviving_edges() {
    let rec = orchestrator();
    rec.start();
    rec.submit_add(vec![
        want("alpha", "source").label("r", "p").build(),
        want("beta", "relay").label("r", "proc").using(&[("r", "p")]).build(),
        want("gamma", "sink").using(&[("r", "proc")]).build(),
    ]);

    let handle = rec.handle();
    assert!(wait_all_achieved(&handle, &["alpha", "beta", "gamma"]).await);

    let alpha_to_beta = handle.get("beta").unwrap().paths().inputs[0].edge.clone();
    let beta_to_gamma = handle.get("gamma").unwrap().paths().inputs[0].edge.clone();

    // Park a message on the surviving edge while everything is quiet.
    assert!(alpha_to_beta.try_send(json!("inflight")));

    // Relabel only gamma.
    let gamma_id = handle.get("gamma").unwrap().id();
    let update = want("gamma", "sink")
        .id(gamma_id.as_str())
        .label("tier", "2")
        .using(&[("r", "proc")])
        .build();
    assert!(rec.update_want(update));
    assert!(
        wait_until(|| {
            handle
                .get("gamma")
                .is_some_and(|w| w.labels().get("tier").map(String::as_str) == Some("2"))
        })
        .await
    );

    // The untouched edge kept its channel and its buffer.
    let alpha_to_beta_after = handle.get("beta").unwrap().paths().inputs[0].edge.clone();
    assert!(alpha_to_beta_after.same_channel(&alpha_to_beta));
    assert_eq!(alpha_to_beta_after.try_recv(), Some(json!("inflight")));

    // The updated want's edge was rebuilt.
    let beta_to_gamma_after = handle.get("gamma").unwrap().paths().inputs[0].edge.clone();
    assert!(!beta_to_gamma_after.same_channel(&beta_to_gamma));
    rec.shutdown();
}

#[tokio::test(start_paused = true)]
async fn selector_cycle_levels_and_start_proceed() {
    use reach_engine::{dependency_levels, PathSeed};

    let rec = orchestrator();
    rec.start();
    rec.submit_add(vec![
        want("ping", "relay").label("side", "a").using(&[("side", "b")]).build(),
        want("pong", "relay").label("side", "b").using(&[("side", "a")]).build(),
    ]);

    // Level assignment completes without hang, both collapse to 0.
    let seeds: Vec<PathSeed> = [("ping", "a", "b"), ("pong", "b", "a")]
        .iter()
        .map(|(name, own, other)| PathSeed {
            name: name.to_string(),
            labels: [("side".to_string(), own.to_string())].into(),
            using: vec![[("side".to_string(), other.to_string())].into()],
        })
        .collect();
    let levels = dependency_levels(&seeds);
    assert_eq!(levels["ping"], 0);
    assert_eq!(levels["pong"], 0);

    // Start proceeds: both loops launch and reach Reaching.
    let handle = rec.handle();
    assert!(
        wait_until(|| {
            ["ping", "pong"].iter().all(|n| {
                handle.get(n).is_some_and(|w| w.status() == WantStatus::Reaching && w.is_active())
            })
        })
        .await
    );
    assert_channel_symmetry(&handle);
    rec.shutdown();
}

#[tokio::test(start_paused = true)]
async fn unschedulable_want_stays_idle_and_recovers() {
    let rec = orchestrator();
    rec.start();
    // A relay with no providers: connectivity unsatisfied, must stay Idle.
    rec.submit_add(vec![
        want("stranded", "relay").label("r", "proc").using(&[("r", "missing")]).build(),
    ]);

    let handle = rec.handle();
    assert!(wait_until(|| handle.get("stranded").is_some()).await);
    tokio::time::sleep(std::time::Duration::from_millis(300)).await;
    let stranded = handle.get("stranded").unwrap();
    assert_eq!(stranded.status(), WantStatus::Idle);
    assert!(!stranded.is_active());

    // Adding the provider and a consumer on a later cycle unblocks it.
    rec.submit_add(vec![
        want("upstream", "source").label("r", "missing").build(),
        want("downstream", "sink").using(&[("r", "proc")]).build(),
    ]);
    assert!(wait_all_achieved(&handle, &["upstream", "stranded", "downstream"]).await);
    rec.shutdown();
}
