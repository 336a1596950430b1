//! Integration tests for the reconciliation engine: append/replace flows,
//! duplicate batches, debounce, stale-response suppression, and failure
//! isolation, driven against a scriptable mock annotation service.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Notify;

use varcura_core::{
    AnnotatedAlterationRecord, Annotator, BufferingNotifier, CurationError, FieldPath,
    GeneContext, ReconciliationEngine, ReferenceGenome, Result,
};

/// Mock annotation service. Every call is recorded; individual names can
/// be scripted to fail, to decline, or to block until a gate opens.
#[derive(Default)]
struct MockAnnotator {
    calls: Mutex<Vec<String>>,
    failing: Mutex<HashSet<String>>,
    declining: Mutex<HashSet<String>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
}

impl MockAnnotator {
    fn fail_on(&self, name: &str) {
        self.failing.lock().unwrap().insert(name.to_string());
    }

    fn decline_on(&self, name: &str) {
        self.declining.lock().unwrap().insert(name.to_string());
    }

    /// Make lookups for `name` block until the returned gate is notified.
    fn gate(&self, name: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .insert(name.to_string(), gate.clone());
        gate
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn call_count(&self, name: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == name).count()
    }
}

#[async_trait]
impl Annotator for MockAnnotator {
    async fn resolve(
        &self,
        _genome: ReferenceGenome,
        alteration: &str,
        gene: &GeneContext,
    ) -> Result<Option<AnnotatedAlterationRecord>> {
        self.calls.lock().unwrap().push(alteration.to_string());
        let gate = self.gates.lock().unwrap().get(alteration).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.failing.lock().unwrap().contains(alteration) {
            return Err(CurationError::lookup_failed(alteration, "service unavailable"));
        }
        if self.declining.lock().unwrap().contains(alteration) {
            return Ok(None);
        }
        Ok(Some(AnnotatedAlterationRecord::new(
            alteration,
            json!({ "query": alteration, "gene": gene.hugo_symbol }),
        )))
    }
}

fn setup() -> (ReconciliationEngine, Arc<MockAnnotator>, Arc<BufferingNotifier>) {
    varcura_core::init_tracing();
    let annotator = Arc::new(MockAnnotator::default());
    let notifier = Arc::new(BufferingNotifier::new());
    let engine = ReconciliationEngine::new(
        annotator.clone(),
        notifier.clone(),
        GeneContext::new(673, "BRAF"),
    );
    (engine, annotator, notifier)
}

/// Let spawned timer and resolution tasks run to completion.
async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn submit_expression_appends_resolved_states() {
    let (engine, annotator, notifier) = setup();

    engine
        .submit_expression("V600E/K [Class 2] {excluding V600Q} (seen in cSCC)")
        .await
        .unwrap();

    let states = engine.alteration_states();
    assert_eq!(states.len(), 2);
    assert_eq!(states[0].alteration, "V600E");
    assert_eq!(states[1].alteration, "V600K");
    for state in &states {
        assert_eq!(state.name, "Class 2");
        assert_eq!(state.comment, "seen in cSCC");
        assert_eq!(state.excluding.len(), 1);
        assert_eq!(state.excluding[0].alteration, "V600Q");
        assert!(state.annotation.is_some());
        assert!(state.excluding[0].annotation.is_some());
    }
    let calls = annotator.calls();
    assert!(calls.contains(&"V600E".to_string()));
    assert!(calls.contains(&"V600K".to_string()));
    assert!(calls.contains(&"V600Q".to_string()));
    assert!(notifier.is_empty());
    assert!(!engine.is_fetching_alteration());
}

#[tokio::test]
async fn duplicate_batch_notifies_exactly_once() {
    let (engine, _annotator, notifier) = setup();

    engine.submit_expression("V600E").await.unwrap();
    engine.submit_expression("V600K").await.unwrap();
    notifier.drain();

    // Both branches duplicate accepted rows: one notice, no new rows.
    engine.submit_expression("v600e/k").await.unwrap();

    assert_eq!(engine.alteration_states().len(), 2);
    let notices = notifier.drain();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].1, "Duplicate alteration(s) removed");
}

#[tokio::test]
async fn duplicates_differing_only_in_exclusions_are_kept() {
    let (engine, _annotator, notifier) = setup();

    engine.submit_expression("V600E {excluding V600K}").await.unwrap();
    engine.submit_expression("V600E").await.unwrap();

    assert_eq!(engine.alteration_states().len(), 2);
    assert!(notifier.is_empty());
}

#[tokio::test(start_paused = true)]
async fn debounced_edits_resolve_once_with_last_text() {
    let (engine, annotator, _notifier) = setup();
    let path = engine.add_blank_field();

    engine.on_field_text_changed(path, "V600E", true).await.unwrap();
    tokio::time::advance(Duration::from_millis(200)).await;
    engine.on_field_text_changed(path, "V600K", true).await.unwrap();
    tokio::time::advance(Duration::from_millis(200)).await;
    engine.on_field_text_changed(path, "V600Q", true).await.unwrap();

    // Nothing resolves during the quiet period.
    tokio::time::advance(Duration::from_millis(999)).await;
    settle().await;
    assert!(annotator.calls().is_empty());
    assert!(engine.is_field_resolving(path).unwrap());

    tokio::time::advance(Duration::from_millis(1)).await;
    settle().await;

    assert_eq!(annotator.calls(), vec!["V600Q".to_string()]);
    let states = engine.alteration_states();
    assert_eq!(states[0].alteration, "V600Q");
    assert!(!engine.is_field_resolving(path).unwrap());
}

#[tokio::test]
async fn stale_response_does_not_overwrite_newer_edit() {
    let (engine, annotator, _notifier) = setup();
    let path = engine.add_blank_field();
    let gate = annotator.gate("V600E");

    // First edit blocks inside the lookup.
    let stale = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.on_field_text_changed(path, "V600E", false).await })
    };
    settle().await;
    assert_eq!(annotator.call_count("V600E"), 1);

    // Second edit lands while the first is still in flight.
    engine.on_field_text_changed(path, "T790M", false).await.unwrap();
    assert_eq!(engine.alteration_states()[0].alteration, "T790M");

    // The stale result arrives and must change nothing.
    gate.notify_one();
    stale.await.unwrap().unwrap();

    let states = engine.alteration_states();
    assert_eq!(states.len(), 1);
    assert_eq!(states[0].alteration, "T790M");
    assert_eq!(
        states[0].annotation.as_ref().unwrap().alteration,
        "T790M"
    );
    assert!(states[0].transient_input.is_none());
    assert!(!engine.is_fetching_alteration());
}

#[tokio::test]
async fn lookup_failure_is_notified_and_filtered() {
    let (engine, annotator, notifier) = setup();
    annotator.fail_on("V600K");

    engine.submit_expression("V600E/K").await.unwrap();

    let states = engine.alteration_states();
    assert_eq!(states.len(), 1);
    assert_eq!(states[0].alteration, "V600E");
    let notices = notifier.drain();
    assert_eq!(notices.len(), 1);
    assert!(notices[0].1.contains("V600K"));
    assert!(!engine.is_fetching_alteration());
}

#[tokio::test]
async fn failed_field_edit_stays_editable() {
    let (engine, annotator, notifier) = setup();
    annotator.fail_on("X999X");
    let path = engine.add_blank_field();

    engine.on_field_text_changed(path, "X999X", false).await.unwrap();

    let states = engine.alteration_states();
    assert_eq!(states.len(), 1);
    assert_eq!(states[0].alteration, "X999X");
    assert!(states[0].annotation.is_none());
    assert!(states[0].transient_input.is_none());
    assert_eq!(notifier.len(), 1);
}

#[tokio::test]
async fn declined_lookup_is_silent() {
    let (engine, annotator, notifier) = setup();
    annotator.decline_on("V600K");

    engine.submit_expression("V600E/K").await.unwrap();

    assert_eq!(engine.alteration_states().len(), 1);
    assert!(notifier.is_empty());
}

#[tokio::test]
async fn unchanged_exclusions_are_reused_not_refetched() {
    let (engine, annotator, _notifier) = setup();

    engine.submit_expression("V600E {excluding V600K}").await.unwrap();
    assert_eq!(annotator.call_count("V600K"), 1);

    engine
        .on_field_text_changed(FieldPath::Alteration(0), "V600M {excluding V600K}", false)
        .await
        .unwrap();

    let states = engine.alteration_states();
    assert_eq!(states[0].alteration, "V600M");
    assert_eq!(states[0].excluding.len(), 1);
    assert_eq!(states[0].excluding[0].alteration, "V600K");
    assert!(states[0].excluding[0].annotation.is_some());
    // The exclusion record was carried over, not fetched again.
    assert_eq!(annotator.call_count("V600K"), 1);
    assert_eq!(annotator.call_count("V600M"), 1);
}

#[tokio::test]
async fn shorthand_edit_splices_one_slot_into_many() {
    let (engine, _annotator, _notifier) = setup();

    engine.submit_expression("V600E").await.unwrap();
    engine.submit_expression("L858R").await.unwrap();

    engine
        .on_field_text_changed(FieldPath::Alteration(0), "T790M/L", false)
        .await
        .unwrap();

    let names: Vec<String> = engine
        .alteration_states()
        .iter()
        .map(|s| s.alteration.clone())
        .collect();
    assert_eq!(names, vec![
        "T790M".to_string(),
        "T790L".to_string(),
        "L858R".to_string()
    ]);
}

#[tokio::test]
async fn editing_a_field_into_an_existing_row_drops_it_with_notice() {
    let (engine, _annotator, notifier) = setup();

    engine.submit_expression("V600E").await.unwrap();
    engine.submit_expression("V600K").await.unwrap();

    engine
        .on_field_text_changed(FieldPath::Alteration(1), "V600E", false)
        .await
        .unwrap();

    // The candidate duplicates row 0; the edited row keeps its last
    // resolved value and the transient marker is cleared.
    let states = engine.alteration_states();
    assert_eq!(states.len(), 2);
    assert_eq!(states[1].alteration, "V600K");
    assert!(states[1].transient_input.is_none());
    assert_eq!(notifier.drain().len(), 1);
}

#[tokio::test]
async fn add_excluded_alteration_extends_selected_row() {
    let (engine, _annotator, notifier) = setup();

    engine.submit_expression("V600E").await.unwrap();
    engine.set_selected_index(Some(0));
    engine.add_excluded_alteration("V600K/Q").await.unwrap();

    let states = engine.alteration_states();
    let excluding: Vec<String> = states[0]
        .excluding
        .iter()
        .map(|ex| ex.alteration.clone())
        .collect();
    assert_eq!(excluding, vec!["V600K".to_string(), "V600Q".to_string()]);
    assert!(notifier.is_empty());
}

#[tokio::test]
async fn add_excluded_alteration_rejects_duplicate_exclusion_set() {
    let (engine, _annotator, notifier) = setup();

    engine.submit_expression("V600E {excluding V600K}").await.unwrap();
    engine.submit_expression("V600E").await.unwrap();
    engine.set_selected_index(Some(1));

    engine.add_excluded_alteration("V600K").await.unwrap();

    // Row 1 would become identical to row 0.
    let states = engine.alteration_states();
    assert!(states[1].excluding.is_empty());
    assert_eq!(notifier.drain().len(), 1);
}

#[tokio::test]
async fn replace_selected_expression_replaces_in_place() {
    let (engine, _annotator, _notifier) = setup();

    engine.submit_expression("V600E").await.unwrap();
    engine.submit_expression("L858R").await.unwrap();
    engine.set_selected_index(Some(0));

    engine
        .replace_selected_expression("T790M (after TKI)")
        .await
        .unwrap();

    let states = engine.alteration_states();
    assert_eq!(states.len(), 2);
    assert_eq!(states[0].alteration, "T790M");
    assert_eq!(states[0].comment, "after TKI");
    assert_eq!(states[1].alteration, "L858R");
}

#[tokio::test]
async fn replace_without_selection_is_unparsable() {
    let (engine, _annotator, _notifier) = setup();
    let err = engine.replace_selected_expression("V600E").await.unwrap_err();
    assert!(matches!(err, CurationError::UnparsablePath { .. }));
}

#[tokio::test]
async fn stale_field_path_is_unparsable() {
    let (engine, _annotator, _notifier) = setup();
    let err = engine
        .on_field_text_changed(FieldPath::Alteration(5), "V600E", false)
        .await
        .unwrap_err();
    assert!(matches!(err, CurationError::UnparsablePath { .. }));
}

#[tokio::test(start_paused = true)]
async fn commit_resolves_immediately_and_cancels_the_timer() {
    let (engine, annotator, _notifier) = setup();
    let path = engine.add_blank_field();

    engine.on_field_text_changed(path, "V600E", true).await.unwrap();
    engine.on_field_committed(path).await.unwrap();

    assert_eq!(annotator.call_count("V600E"), 1);
    assert_eq!(engine.alteration_states()[0].alteration, "V600E");

    // The aborted timer never fires a second resolution.
    tokio::time::advance(Duration::from_millis(2000)).await;
    settle().await;
    assert_eq!(annotator.call_count("V600E"), 1);
}

#[tokio::test]
async fn editing_an_exclusion_slot_resolves_within_the_parent() {
    let (engine, annotator, _notifier) = setup();

    engine.submit_expression("V600E {excluding V600K}").await.unwrap();

    engine
        .on_field_text_changed(
            FieldPath::Excluding {
                alteration: 0,
                excluding: 0,
            },
            "V600Q/R",
            false,
        )
        .await
        .unwrap();

    let states = engine.alteration_states();
    let excluding: Vec<String> = states[0]
        .excluding
        .iter()
        .map(|ex| ex.alteration.clone())
        .collect();
    assert_eq!(excluding, vec!["V600Q".to_string(), "V600R".to_string()]);
    assert_eq!(annotator.call_count("V600Q"), 1);
    assert_eq!(annotator.call_count("V600R"), 1);
    assert!(!engine.is_fetching_excluding());
}

#[tokio::test]
async fn duplicate_exclusion_edit_removes_the_slot() {
    let (engine, _annotator, notifier) = setup();

    engine.submit_expression("V600E {excluding V600K}").await.unwrap();
    engine.submit_expression("V600E {excluding V600Q}").await.unwrap();

    // Editing row 1's exclusion to V600K makes it identical to row 0.
    engine
        .on_field_text_changed(
            FieldPath::Excluding {
                alteration: 1,
                excluding: 0,
            },
            "V600K",
            false,
        )
        .await
        .unwrap();

    let states = engine.alteration_states();
    assert!(states[1].excluding.is_empty());
    assert_eq!(notifier.drain().len(), 1);
}

#[tokio::test]
async fn remove_field_and_reset() {
    let (engine, _annotator, _notifier) = setup();

    engine.submit_expression("V600E {excluding V600K}").await.unwrap();
    engine.submit_expression("L858R").await.unwrap();

    engine
        .remove_field(FieldPath::Excluding {
            alteration: 0,
            excluding: 0,
        })
        .unwrap();
    assert!(engine.alteration_states()[0].excluding.is_empty());

    engine.remove_field(FieldPath::Alteration(0)).unwrap();
    assert_eq!(engine.alteration_states().len(), 1);

    engine.reset();
    assert!(engine.alteration_states().is_empty());
    assert_eq!(engine.selected_index(), None);
}

#[tokio::test]
async fn current_names_reflect_resolved_rows() {
    let (engine, _annotator, _notifier) = setup();

    engine.submit_expression("V600E {excluding V600K} (note)").await.unwrap();
    engine.submit_expression("Amplification").await.unwrap();

    assert_eq!(engine.current_alteration_names(), vec![
        "amplification".to_string(),
        "v600e {excluding v600k}".to_string(),
    ]);
}
