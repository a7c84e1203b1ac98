// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle scenarios: idempotency, failure surfacing, retriggers,
//! batch mode, and the persistence surfaces.

use crate::prelude::*;
use reach_engine::ReconcilerOptions;
use std::io::Write;

#[tokio::test(start_paused = true)]
async fn reconciling_unchanged_config_changes_nothing() {
    let rec = orchestrator();
    rec.start();
    rec.submit_add(vec![
        want("alpha", "source").label("r", "p").build(),
        want("omega", "sink").using(&[("r", "p")]).build(),
    ]);
    let handle = rec.handle();
    assert!(wait_all_achieved(&handle, &["alpha", "omega"]).await);

    let before: Vec<_> =
        handle.snapshot().iter().map(|w| (w.name(), w.id(), w.status())).collect();
    let edge_before = handle.get("omega").unwrap().paths().inputs[0].edge.clone();

    for _ in 0..3 {
        rec.trigger_reconcile();
    }
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    let after: Vec<_> =
        handle.snapshot().iter().map(|w| (w.name(), w.id(), w.status())).collect();
    assert_eq!(before, after);
    let edge_after = handle.get("omega").unwrap().paths().inputs[0].edge.clone();
    assert!(edge_after.same_channel(&edge_before));
    rec.shutdown();
}

#[tokio::test(start_paused = true)]
async fn unknown_type_surfaces_as_failed_state() {
    let rec = orchestrator();
    rec.start();
    rec.submit_add(vec![want("enigma", "warp-drive").build()]);

    let handle = rec.handle();
    assert!(wait_status(&handle, "enigma", WantStatus::Failed).await);
    let error = handle.get("enigma").unwrap().state.get("error").unwrap();
    assert!(error.as_str().unwrap().contains("unknown want type"));
    rec.shutdown();
}

#[tokio::test(start_paused = true)]
async fn panicking_progress_surfaces_as_failed_state() {
    let rec = orchestrator();
    rec.start();
    rec.submit_add(vec![want("grenade", "panicky").build()]);

    let handle = rec.handle();
    assert!(wait_status(&handle, "grenade", WantStatus::Failed).await);
    let error = handle.get("grenade").unwrap().state.get("error").unwrap();
    assert!(error.as_str().unwrap().contains("panicked"));
    rec.shutdown();
}

#[tokio::test(start_paused = true)]
async fn provider_completion_retriggers_chain_downstream() {
    let rec = orchestrator();
    rec.start();
    rec.submit_add(vec![
        want("alpha", "source").label("r", "p").build(),
        want("beta", "relay").label("r", "proc").using(&[("r", "p")]).build(),
        want("gamma", "sink").using(&[("r", "proc")]).build(),
    ]);
    let handle = rec.handle();
    assert!(wait_all_achieved(&handle, &["alpha", "beta", "gamma"]).await);
    assert_eq!(handle.get("gamma").unwrap().state.get("received"), Some(json!(1)));

    // Re-running the head of the chain must ripple a second message all
    // the way down within bounded reconcile cycles.
    let alpha_id = handle.get("alpha").unwrap().id();
    assert!(rec.restart(alpha_id));
    assert!(
        wait_until(|| {
            handle.get("gamma").is_some_and(|w| w.state.get("received") == Some(json!(2)))
        })
        .await
    );
    rec.shutdown();
}

#[tokio::test(start_paused = true)]
async fn batch_mode_loads_config_file_and_terminates() {
    let mut config = tempfile::NamedTempFile::new().unwrap();
    config
        .write_all(
            br#"
wants:
  - metadata:
      name: feeder
      type: source
      labels:
        r: p
    spec:
      params:
        count: 2
  - metadata:
      name: well
      type: sink
    spec:
      using:
        - r: p
      params:
        expect: 2
"#,
        )
        .unwrap();

    let rec = orchestrator_with(ReconcilerOptions {
        config_path: Some(config.path().to_path_buf()),
        memory_path: None,
    });
    rec.execute_batch().await;

    let handle = rec.handle();
    let wants = handle.snapshot();
    assert_eq!(wants.len(), 2);
    assert!(wants.iter().all(|w| w.status() == WantStatus::Achieved));
    assert_eq!(handle.get("well").unwrap().state.get("received"), Some(json!(2)));
}

#[tokio::test(start_paused = true)]
async fn memory_file_persists_runtime_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let memory_path = dir.path().join("memory.yaml");

    let rec = orchestrator_with(ReconcilerOptions {
        config_path: None,
        memory_path: Some(memory_path.clone()),
    });
    rec.start();
    rec.submit_add(vec![
        want("alpha", "source").label("r", "p").build(),
        want("omega", "sink").using(&[("r", "p")]).build(),
    ]);
    let handle = rec.handle();
    assert!(wait_all_achieved(&handle, &["alpha", "omega"]).await);

    assert!(wait_until(|| memory_path.exists()).await);
    let doc: serde_yaml::Value =
        serde_yaml::from_slice(&std::fs::read(&memory_path).unwrap()).unwrap();
    assert!(doc.get("timestamp").is_some());
    assert!(doc.get("execution_id").is_some());
    let wants = doc.get("wants").and_then(|w| w.as_sequence()).unwrap();
    assert_eq!(wants.len(), 2);
    rec.shutdown();
}

#[tokio::test(start_paused = true)]
async fn config_file_edit_is_picked_up_by_the_ticker() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("wants.yaml");
    std::fs::write(
        &config_path,
        b"wants:\n  - metadata:\n      name: lone\n      type: task\n",
    )
    .unwrap();

    let rec = orchestrator_with(ReconcilerOptions {
        config_path: Some(config_path.clone()),
        memory_path: None,
    });
    rec.start();
    let handle = rec.handle();
    assert!(wait_status(&handle, "lone", WantStatus::Achieved).await);

    // Appending a second want to the file must create it; the first one
    // survives untouched.
    std::fs::write(
        &config_path,
        b"wants:\n  - metadata:\n      name: lone\n      type: task\n  - metadata:\n      name: late\n      type: task\n",
    )
    .unwrap();
    assert!(wait_status(&handle, "late", WantStatus::Achieved).await);
    assert!(handle.get("lone").is_some());
    rec.shutdown();
}
