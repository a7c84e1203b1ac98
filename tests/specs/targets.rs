// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parent/child scenarios: recipe expansion, completion aggregation,
//! cascade delete.

use crate::prelude::*;

const CREW_RECIPE: &str = r#"
recipe:
  parameters:
    prefix: crew
    cycles: 2
  result:
    - want_name: "${prefix}-one"
      state_key: ticks
  wants:
    - metadata:
        name: "${prefix}-one"
        type: task
      spec:
        params:
          cycles: ${cycles}
    - metadata:
        name: "${prefix}-two"
        type: task
      spec:
        params:
          cycles: ${cycles}
    - metadata:
        name: "${prefix}-three"
        type: task
      spec:
        params:
          cycles: ${cycles}
"#;

#[tokio::test(start_paused = true)]
async fn target_completes_when_children_do() {
    let recipe = recipe_file(CREW_RECIPE);
    let rec = orchestrator();
    rec.start();
    rec.submit_add(vec![
        want("captain", "target")
            .param("recipe", recipe.path().display().to_string().as_str())
            .build(),
    ]);

    let handle = rec.handle();
    assert!(
        wait_until(|| {
            ["crew-one", "crew-two", "crew-three"].iter().all(|n| handle.get(n).is_some())
        })
        .await
    );

    // Children carry a controller owner reference to the target.
    let captain_id = handle.get("captain").unwrap().id();
    for name in ["crew-one", "crew-two", "crew-three"] {
        assert!(handle.get(name).unwrap().config_snapshot().owned_by(&captain_id));
    }

    assert!(wait_status(&handle, "captain", WantStatus::Achieved).await);
    let captain = handle.get("captain").unwrap();
    assert_eq!(captain.state.get("achieving_percentage"), Some(json!(100)));

    // The recipe's declared result was copied from the child's state.
    let results = captain.state.get("results").unwrap();
    assert_eq!(results.get("crew-one"), Some(&json!(2)));

    // The percentage only ever climbed.
    let climbs: Vec<u64> = captain
        .state
        .state_history()
        .iter()
        .filter_map(|e| e.state_value.get("achieving_percentage").and_then(|v| v.as_u64()))
        .collect();
    assert!(climbs.windows(2).all(|p| p[0] <= p[1]));

    assert_unique_ids(&handle);
    rec.shutdown();
}

#[tokio::test(start_paused = true)]
async fn cascade_delete_removes_children_then_target() {
    let recipe = recipe_file(CREW_RECIPE);
    let rec = orchestrator();
    rec.start();
    rec.submit_add(vec![
        want("captain", "target")
            .param("recipe", recipe.path().display().to_string().as_str())
            .build(),
    ]);

    let handle = rec.handle();
    assert!(wait_status(&handle, "captain", WantStatus::Achieved).await);
    assert_eq!(handle.snapshot().len(), 4);

    let captain_id = handle.get("captain").unwrap().id();
    let all_ids: Vec<WantId> = handle.snapshot().iter().map(|w| w.id()).collect();

    rec.submit_delete(vec![captain_id.clone()]);
    assert!(wait_until(|| rec.are_deleted(&all_ids)).await);

    // Registry shrank by four in one sweep; no orphan kept a reference.
    assert_eq!(handle.snapshot().len(), 0);
    rec.shutdown();
}

#[tokio::test(start_paused = true)]
async fn recipe_parameters_flow_from_target_params() {
    let recipe = recipe_file(CREW_RECIPE);
    let rec = orchestrator();
    rec.start();
    rec.submit_add(vec![
        want("captain", "target")
            .param("recipe", recipe.path().display().to_string().as_str())
            .param("prefix", "squad")
            .param("cycles", 1)
            .build(),
    ]);

    let handle = rec.handle();
    assert!(wait_until(|| handle.get("squad-one").is_some()).await);
    assert_eq!(handle.get("squad-one").unwrap().param("cycles"), Some(json!(1)));
    assert!(wait_status(&handle, "captain", WantStatus::Achieved).await);
    rec.shutdown();
}
