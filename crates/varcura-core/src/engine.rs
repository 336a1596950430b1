//! Annotation reconciliation engine
//!
//! The engine sits between the input fields of the add/edit-mutation modal
//! and the annotation service. A text edit parses into fragments, survives
//! duplicate filtering, resolves each atomic name concurrently, and the
//! results splice back into the session, unless a later edit superseded
//! the resolution while it was in flight.
//!
//! Correctness rests on two tokens. Each field slot has a stable `FieldId`
//! so results land on the right slot even when sibling expansions shift
//! indices, and a per-slot generation that every edit bumps. A resolution
//! captures both and applies only when the generation still matches;
//! otherwise the result is discarded whole. There is no hard cancellation
//! of in-flight lookups; the generation check at apply time is the sole
//! cancellation mechanism. Debounce timers are the exception: a new edit
//! aborts the previous timer deterministically while it is still sleeping.
//!
//! The session lives behind one mutex that is never held across an await,
//! so every splice is a single synchronous update and engine mutations are
//! linearizable with UI mutations.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::result::{Result, ResultExt};
use crate::annotate::{AnnotatedAlterationRecord, Annotator, GeneContext};
use crate::config::EngineConfig;
use crate::dedup;
use crate::notify::{NotificationKind, NotificationSink};
use crate::parser::parse_alteration_name;
use crate::session::{
    AlterationState, CategoryFlag, FetchKind, FieldId, FieldPath, ModalSession,
};

/// User-visible notice emitted once per batch that dropped duplicates.
pub const DUPLICATE_NOTICE: &str = "Duplicate alteration(s) removed";

/// How one expanded branch of an edited field obtains its record.
enum BranchSource {
    /// The branch text equals the slot's last resolved alteration; keep
    /// the existing state and its annotation, no lookup.
    ReuseCurrent,
    /// Freshly looked up; `None` when the lookup declined or failed.
    Fetched(Option<AnnotatedAlterationRecord>),
}

/// How the edited field's exclusion list is obtained.
enum ExclusionSource {
    /// Parsed exclusion names equal the previously resolved ones; reuse
    /// the existing records, no lookups.
    Reuse,
    /// Freshly looked up, absent results already filtered out.
    Fetched(Vec<(String, AnnotatedAlterationRecord)>),
}

struct EngineInner {
    session: ModalSession,
    /// One live debounce timer per field at most; the stored generation is
    /// the edit that scheduled it.
    timers: HashMap<FieldId, (u64, JoinHandle<()>)>,
}

/// Reconciliation engine for one modal session. Cheap to clone; clones
/// share the same session.
#[derive(Clone)]
pub struct ReconciliationEngine {
    inner: Arc<Mutex<EngineInner>>,
    annotator: Arc<dyn Annotator>,
    notifier: Arc<dyn NotificationSink>,
    config: EngineConfig,
    gene: GeneContext,
}

impl ReconciliationEngine {
    pub fn new(
        annotator: Arc<dyn Annotator>,
        notifier: Arc<dyn NotificationSink>,
        gene: GeneContext,
    ) -> Self {
        Self::with_config(annotator, notifier, gene, EngineConfig::default())
    }

    pub fn with_config(
        annotator: Arc<dyn Annotator>,
        notifier: Arc<dyn NotificationSink>,
        gene: GeneContext,
        config: EngineConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(EngineInner {
                session: ModalSession::new(),
                timers: HashMap::new(),
            })),
            annotator,
            notifier,
            config,
            gene,
        }
    }

    fn lock(&self) -> MutexGuard<'_, EngineInner> {
        // A panic while holding the lock leaves the session in whatever
        // consistent state the last completed splice produced.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ---- observable state -------------------------------------------------

    /// Snapshot of the ordered alteration list.
    pub fn alteration_states(&self) -> Vec<AlterationState> {
        self.lock().session.alteration_states().to_vec()
    }

    pub fn is_fetching_alteration(&self) -> bool {
        self.lock().session.is_fetching_alteration()
    }

    pub fn is_fetching_excluding(&self) -> bool {
        self.lock().session.is_fetching_excluding()
    }

    /// Is a resolution in flight for this specific field?
    pub fn is_field_resolving(&self, path: FieldPath) -> Result<bool> {
        Ok(self.lock().session.state_at(path)?.transient_input.is_some())
    }

    pub fn current_alteration_names(&self) -> Vec<String> {
        self.lock().session.current_alteration_names()
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.lock().session.selected_index()
    }

    pub fn set_selected_index(&self, index: Option<usize>) {
        self.lock().session.set_selected_index(index);
    }

    pub fn show_exon_edit(&self) -> bool {
        self.lock().session.show_exon_edit()
    }

    pub fn set_show_exon_edit(&self, show: bool) {
        self.lock().session.set_show_exon_edit(show);
    }

    pub fn category_comment(&self) -> String {
        self.lock().session.category_comment().to_string()
    }

    pub fn set_category_comment(&self, comment: impl Into<String>) {
        self.lock().session.set_category_comment(comment);
    }

    pub fn category_flags(&self) -> Vec<CategoryFlag> {
        self.lock().session.category_flags().to_vec()
    }

    pub fn set_category_flags(&self, flags: Vec<CategoryFlag>) {
        self.lock().session.set_category_flags(flags);
    }

    // ---- field surface ----------------------------------------------------

    /// Append a blank editable row and return its path.
    pub fn add_blank_field(&self) -> FieldPath {
        let mut inner = self.lock();
        let id = inner.session.add_blank_state();
        inner
            .session
            .locate_field(id)
            .unwrap_or(FieldPath::Alteration(0))
    }

    /// Remove a field, cancelling any pending debounce timer for it.
    pub fn remove_field(&self, path: FieldPath) -> Result<()> {
        let mut inner = self.lock();
        match path {
            FieldPath::Alteration(index) => {
                let removed = inner.session.remove_state(index)?;
                abort_timer(&mut inner.timers, removed.id);
                for excluded in &removed.excluding {
                    abort_timer(&mut inner.timers, excluded.id);
                }
            }
            FieldPath::Excluding {
                alteration,
                excluding,
            } => {
                let parent = inner
                    .session
                    .state_at_mut(FieldPath::Alteration(alteration))?;
                if excluding >= parent.excluding.len() {
                    return Err(crate::CurationError::unparsable_path(path.to_string()));
                }
                let removed = parent.excluding.remove(excluding);
                abort_timer(&mut inner.timers, removed.id);
            }
        }
        Ok(())
    }

    /// Clear the whole session and cancel every pending timer.
    pub fn reset(&self) {
        let mut inner = self.lock();
        for (_, (_, handle)) in inner.timers.drain() {
            handle.abort();
        }
        inner.session.reset();
    }

    /// React to the text of a field changing. Debounced edits schedule
    /// resolution after the configured quiet period, restarting it on
    /// every further edit; non-debounced edits resolve immediately.
    pub async fn on_field_text_changed(
        &self,
        path: FieldPath,
        text: &str,
        debounced: bool,
    ) -> Result<()> {
        let kind = fetch_kind(path);
        let (id, generation) = {
            let mut inner = self.lock();
            let state = inner.session.state_at_mut(path)?;
            state.transient_input = Some(text.to_string());
            state.generation += 1;
            let id = state.id;
            let generation = state.generation;
            abort_timer(&mut inner.timers, id);

            if debounced {
                let engine = self.clone();
                let text = text.to_string();
                // The quiet period is measured from the edit itself, so the
                // deadline is captured here, not when the task first runs.
                let sleep = tokio::time::sleep(self.config.debounce());
                let handle = tokio::spawn(async move {
                    sleep.await;
                    // Once the quiet period elapsed, the resolution must
                    // not be aborted with the timer handle; only the
                    // generation check may discard it.
                    tokio::spawn(async move {
                        engine.resolve_field(id, generation, text, kind).await;
                    });
                });
                inner.timers.insert(id, (generation, handle));
            }
            (id, generation)
        };

        if !debounced {
            self.resolve_field(id, generation, text.to_string(), kind)
                .await;
        }
        Ok(())
    }

    /// Commit a field now: cancel its pending timer and resolve the
    /// current text immediately, superseding anything in flight.
    pub async fn on_field_committed(&self, path: FieldPath) -> Result<()> {
        let kind = fetch_kind(path);
        let (id, generation, text) = {
            let mut inner = self.lock();
            let state = inner.session.state_at_mut(path)?;
            state.generation += 1;
            let text = state
                .transient_input
                .clone()
                .unwrap_or_else(|| state.alteration.clone());
            state.transient_input = Some(text.clone());
            let id = state.id;
            let generation = state.generation;
            abort_timer(&mut inner.timers, id);
            (id, generation, text)
        };
        self.resolve_field(id, generation, text, kind).await;
        Ok(())
    }

    // ---- structured replacement -------------------------------------------

    /// Parse a whole expression and append its resolved alterations at the
    /// end of the list. Duplicates are dropped with one notice per batch.
    pub async fn submit_expression(&self, expression: &str) -> Result<()> {
        let fragments = parse_alteration_name(expression);
        let survivors = {
            let inner = self.lock();
            let (survivors, dropped) =
                dedup::filter_duplicates(fragments, inner.session.alteration_states(), None);
            drop(inner);
            if dropped > 0 {
                self.notifier.notify(NotificationKind::Error, DUPLICATE_NOTICE);
            }
            survivors
        };
        if survivors.is_empty() {
            return Ok(());
        }
        debug!(expression, branches = survivors.len(), "submitting expression");

        self.lock().session.begin_fetch(FetchKind::Alteration);
        let shared = survivors[0].clone();
        let base_names: Vec<String> = survivors.iter().map(|f| f.alteration.clone()).collect();
        let (bases, exclusions) = futures::join!(
            self.fetch_batch(base_names),
            self.fetch_batch(shared.excluding.clone())
        );

        let mut inner = self.lock();
        let excluding_states = build_exclusion_states(&mut inner.session, resolved_only(exclusions));
        for (alteration, record) in bases {
            let Some(record) = record else { continue };
            let state = inner.session.new_state(
                &alteration,
                display_name(&shared.name, &alteration),
                &shared.comment,
                excluding_states.clone(),
                Some(record),
            );
            inner.session.push_state(state);
        }
        inner.session.end_fetch(FetchKind::Alteration);
        Ok(())
    }

    /// Parse a whole expression and replace the selected row with its
    /// first resolved alteration.
    pub async fn replace_selected_expression(&self, expression: &str) -> Result<()> {
        let selected = self
            .selected_index()
            .ok_or_else(|| crate::CurationError::unparsable_path("no selected alteration"))?;

        let fragments = parse_alteration_name(expression);
        let survivors = {
            let inner = self.lock();
            let (survivors, dropped) = dedup::filter_duplicates(
                fragments,
                inner.session.alteration_states(),
                Some(selected),
            );
            drop(inner);
            if dropped > 0 {
                self.notifier.notify(NotificationKind::Error, DUPLICATE_NOTICE);
            }
            survivors
        };
        if survivors.is_empty() {
            return Ok(());
        }

        self.lock().session.begin_fetch(FetchKind::Alteration);
        let shared = survivors[0].clone();
        let (bases, exclusions) = futures::join!(
            self.fetch_batch(vec![shared.alteration.clone()]),
            self.fetch_batch(shared.excluding.clone())
        );

        let mut inner = self.lock();
        let excluding_states = build_exclusion_states(&mut inner.session, resolved_only(exclusions));
        if let Some((alteration, Some(record))) = bases.into_iter().next() {
            let state = inner.session.new_state(
                &alteration,
                display_name(&shared.name, &alteration),
                &shared.comment,
                excluding_states,
                Some(record),
            );
            inner.session.splice_states(selected, vec![state])?;
        }
        inner.session.end_fetch(FetchKind::Alteration);
        Ok(())
    }

    /// Parse an expression and push its resolved alterations onto the
    /// selected row's exclusion list, unless the resulting exclusion set
    /// would duplicate an existing row.
    pub async fn add_excluded_alteration(&self, expression: &str) -> Result<()> {
        let selected = self
            .selected_index()
            .ok_or_else(|| crate::CurationError::unparsable_path("no selected alteration"))?;

        let fragments = parse_alteration_name(expression);
        if fragments.is_empty() {
            return Ok(());
        }

        {
            let inner = self.lock();
            let current = inner.session.state_at(FieldPath::Alteration(selected))?;
            let mut would_be: Vec<String> = current
                .excluding
                .iter()
                .map(|ex| ex.alteration.clone())
                .collect();
            would_be.extend(fragments.iter().map(|f| f.alteration.clone()));
            if dedup::exclusion_set_exists(
                &current.alteration,
                &would_be,
                inner.session.alteration_states(),
            ) {
                drop(inner);
                self.notifier.notify(NotificationKind::Error, DUPLICATE_NOTICE);
                return Ok(());
            }
        }

        self.lock().session.begin_fetch(FetchKind::Excluding);
        let shared = fragments[0].clone();
        let names: Vec<String> = fragments.iter().map(|f| f.alteration.clone()).collect();
        let resolved = resolved_only(self.fetch_batch(names).await);

        let mut inner = self.lock();
        let mut new_states = Vec::with_capacity(resolved.len());
        for (alteration, record) in resolved {
            new_states.push(inner.session.new_state(
                &alteration,
                display_name(&shared.name, &alteration),
                &shared.comment,
                Vec::new(),
                Some(record),
            ));
        }
        let target = inner.session.state_at_mut(FieldPath::Alteration(selected))?;
        target.excluding.extend(new_states);
        inner.session.end_fetch(FetchKind::Excluding);
        Ok(())
    }

    // ---- resolution -------------------------------------------------------

    /// Resolve one field edit end to end. Infallible by design: every
    /// failure degrades to a notification plus a smaller consistent state.
    async fn resolve_field(&self, id: FieldId, generation: u64, text: String, kind: FetchKind) {
        self.lock().session.begin_fetch(kind);
        match kind {
            FetchKind::Alteration => self.resolve_alteration_field(id, generation, &text).await,
            FetchKind::Excluding => self.resolve_excluding_field(id, generation, &text).await,
        }
        let mut inner = self.lock();
        inner.session.end_fetch(kind);
        // Drop the timer entry only if it is still ours; a newer edit may
        // have installed its own timer under the same field id.
        let ours = inner
            .timers
            .get(&id)
            .is_some_and(|(timer_generation, _)| *timer_generation == generation);
        if ours {
            inner.timers.remove(&id);
        }
    }

    /// Edit of a top-level alteration row.
    async fn resolve_alteration_field(&self, id: FieldId, generation: u64, text: &str) {
        // Capture the slot's current identity under the lock.
        let (index, current_alteration, current_excluding_names) = {
            let inner = self.lock();
            let Some(path @ FieldPath::Alteration(index)) = inner.session.locate_field(id) else {
                trace!(id, "field gone before resolution started");
                return;
            };
            let Ok(state) = inner.session.state_at(path) else {
                return;
            };
            if state.generation != generation {
                trace!(id, "superseded before resolution started");
                return;
            }
            let names: Vec<String> = state
                .excluding
                .iter()
                .map(|ex| ex.alteration.clone())
                .collect();
            (index, state.alteration.clone(), names)
        };

        let fragments = parse_alteration_name(text);
        let (survivors, dropped) = {
            let inner = self.lock();
            dedup::filter_duplicates(fragments, inner.session.alteration_states(), Some(index))
        };
        if dropped > 0 {
            self.notifier.notify(NotificationKind::Error, DUPLICATE_NOTICE);
        }
        if survivors.is_empty() {
            self.clear_transient(id, generation);
            return;
        }
        let shared = survivors[0].clone();

        // Reuse the resolved exclusion records when the parsed list is
        // unchanged; expanded branches equal to the current alteration
        // reuse the slot instead of re-fetching.
        let exclusion_future = async {
            if shared.excluding == current_excluding_names {
                ExclusionSource::Reuse
            } else {
                ExclusionSource::Fetched(resolved_only(
                    self.fetch_batch(shared.excluding.clone()).await,
                ))
            }
        };
        let branch_future = async {
            let mut branches: Vec<(String, BranchSource)> = Vec::with_capacity(survivors.len());
            let mut to_fetch: Vec<String> = Vec::new();
            for (branch_index, fragment) in survivors.iter().enumerate() {
                if branch_index == 0 && fragment.alteration == current_alteration {
                    branches.push((fragment.alteration.clone(), BranchSource::ReuseCurrent));
                } else {
                    to_fetch.push(fragment.alteration.clone());
                    branches.push((
                        fragment.alteration.clone(),
                        BranchSource::Fetched(None),
                    ));
                }
            }
            let fetched = self.fetch_batch(to_fetch).await;
            let mut fetched_iter = fetched.into_iter();
            for (_, source) in branches.iter_mut() {
                if let BranchSource::Fetched(slot) = source {
                    *slot = fetched_iter.next().and_then(|(_, record)| record);
                }
            }
            branches
        };
        let (exclusions, branches) = futures::join!(exclusion_future, branch_future);

        // Apply atomically, unless a newer edit superseded this pass.
        let mut inner = self.lock();
        let Some(path @ FieldPath::Alteration(index)) = inner.session.locate_field(id) else {
            debug!(id, "field removed while resolving; result discarded");
            return;
        };
        let Ok(current) = inner.session.state_at(path) else {
            return;
        };
        if current.generation != generation {
            debug!(id, generation, "resolution superseded; result discarded");
            return;
        }

        let excluding_states = match exclusions {
            ExclusionSource::Reuse => current.excluding.clone(),
            ExclusionSource::Fetched(resolved) => {
                build_exclusion_states(&mut inner.session, resolved)
            }
        };

        let mut new_states: Vec<AlterationState> = Vec::new();
        for (alteration, source) in branches {
            match source {
                BranchSource::ReuseCurrent => {
                    let Ok(state) = inner.session.state_at(path) else {
                        continue;
                    };
                    let mut reused = state.clone();
                    reused.excluding = excluding_states.clone();
                    reused.comment = shared.comment.clone();
                    reused.name = display_name(&shared.name, &reused.alteration);
                    reused.transient_input = None;
                    new_states.push(reused);
                }
                BranchSource::Fetched(Some(record)) => {
                    let state = inner.session.new_state(
                        &alteration,
                        display_name(&shared.name, &alteration),
                        &shared.comment,
                        excluding_states.clone(),
                        Some(record),
                    );
                    new_states.push(state);
                }
                BranchSource::Fetched(None) => {}
            }
        }

        if new_states.is_empty() {
            // Every branch failed to resolve. Keep the row editable with
            // the typed text and no annotation instead of dropping it.
            if let Ok(state) = inner.session.state_at_mut(path) {
                state.alteration = shared.alteration.clone();
                state.name = display_name(&shared.name, &shared.alteration);
                state.comment = shared.comment.clone();
                state.excluding = excluding_states;
                state.annotation = None;
                state.transient_input = None;
            }
            return;
        }

        // The first replacement keeps the slot's identity so further edits
        // of the same input box address the same field.
        new_states[0].id = id;
        new_states[0].generation = generation;
        new_states[0].transient_input = None;
        let replaced_with = new_states.len();
        if inner.session.splice_states(index, new_states).is_ok() {
            debug!(id, branches = replaced_with, "alteration field resolved");
        }
    }

    /// Edit of one exclusion slot inside a row.
    async fn resolve_excluding_field(&self, id: FieldId, generation: u64, text: &str) {
        let fragments = parse_alteration_name(text);
        if fragments.is_empty() {
            self.clear_transient(id, generation);
            return;
        }

        // Duplicate check: would the parent's exclusion set, with this
        // slot replaced by the parsed names, collide with another row?
        let current_slot_alteration = {
            let inner = self.lock();
            let Some(
                path @ FieldPath::Excluding {
                    alteration: parent_index,
                    excluding: slot_index,
                },
            ) = inner.session.locate_field(id)
            else {
                trace!(id, "exclusion slot gone before resolution started");
                return;
            };
            let Ok(slot) = inner.session.state_at(path) else {
                return;
            };
            if slot.generation != generation {
                return;
            }
            let Ok(parent) = inner.session.state_at(FieldPath::Alteration(parent_index)) else {
                return;
            };
            let mut would_be: Vec<String> = Vec::new();
            for (index, ex) in parent.excluding.iter().enumerate() {
                if index == slot_index {
                    would_be.extend(fragments.iter().map(|f| f.alteration.clone()));
                } else {
                    would_be.push(ex.alteration.clone());
                }
            }
            let others: Vec<AlterationState> = inner
                .session
                .alteration_states()
                .iter()
                .enumerate()
                .filter(|(index, _)| *index != parent_index)
                .map(|(_, state)| state.clone())
                .collect();
            if dedup::exclusion_set_exists(&parent.alteration, &would_be, &others) {
                drop(inner);
                self.notifier.notify(NotificationKind::Error, DUPLICATE_NOTICE);
                self.remove_duplicate_exclusion_slot(id, generation);
                return;
            }
            slot.alteration.clone()
        };

        // First branch reuses the slot's record when the text is
        // unchanged; remaining branches always fetch.
        let shared = fragments[0].clone();
        let mut branches: Vec<(String, BranchSource)> = Vec::with_capacity(fragments.len());
        let mut to_fetch: Vec<String> = Vec::new();
        for (branch_index, fragment) in fragments.iter().enumerate() {
            if branch_index == 0 && fragment.alteration == current_slot_alteration {
                branches.push((fragment.alteration.clone(), BranchSource::ReuseCurrent));
            } else {
                to_fetch.push(fragment.alteration.clone());
                branches.push((fragment.alteration.clone(), BranchSource::Fetched(None)));
            }
        }
        let fetched = self.fetch_batch(to_fetch).await;
        let mut fetched_iter = fetched.into_iter();
        for (_, source) in branches.iter_mut() {
            if let BranchSource::Fetched(slot) = source {
                *slot = fetched_iter.next().and_then(|(_, record)| record);
            }
        }

        let mut inner = self.lock();
        let Some(
            path @ FieldPath::Excluding {
                alteration: parent_index,
                excluding: slot_index,
            },
        ) = inner.session.locate_field(id)
        else {
            debug!(id, "exclusion slot removed while resolving; result discarded");
            return;
        };
        let Ok(slot) = inner.session.state_at(path) else {
            return;
        };
        if slot.generation != generation {
            debug!(id, generation, "exclusion resolution superseded; result discarded");
            return;
        }

        let mut new_states: Vec<AlterationState> = Vec::new();
        for (alteration, source) in branches {
            match source {
                BranchSource::ReuseCurrent => {
                    if let Ok(slot) = inner.session.state_at(path) {
                        let mut reused = slot.clone();
                        reused.transient_input = None;
                        new_states.push(reused);
                    }
                }
                BranchSource::Fetched(Some(record)) => {
                    new_states.push(inner.session.new_state(
                        &alteration,
                        display_name(&shared.name, &alteration),
                        &shared.comment,
                        Vec::new(),
                        Some(record),
                    ));
                }
                BranchSource::Fetched(None) => {}
            }
        }

        let Ok(parent) = inner
            .session
            .state_at_mut(FieldPath::Alteration(parent_index))
        else {
            return;
        };
        if new_states.is_empty() {
            if let Some(slot) = parent.excluding.get_mut(slot_index) {
                slot.alteration = shared.alteration.clone();
                slot.annotation = None;
                slot.transient_input = None;
            }
            return;
        }
        new_states[0].id = id;
        new_states[0].generation = generation;
        new_states[0].transient_input = None;
        let _ = parent.excluding.splice(slot_index..=slot_index, new_states);
        debug!(id, "exclusion slot resolved");
    }

    /// Drop an exclusion slot whose edit produced a duplicate set.
    fn remove_duplicate_exclusion_slot(&self, id: FieldId, generation: u64) {
        let mut inner = self.lock();
        let Some(FieldPath::Excluding {
            alteration: parent_index,
            excluding: slot_index,
        }) = inner.session.locate_field(id)
        else {
            return;
        };
        let Ok(parent) = inner
            .session
            .state_at_mut(FieldPath::Alteration(parent_index))
        else {
            return;
        };
        if parent
            .excluding
            .get(slot_index)
            .is_some_and(|slot| slot.generation == generation)
        {
            parent.excluding.remove(slot_index);
        }
    }

    /// Clear a field's in-flight marker if this resolution is still the
    /// current one.
    fn clear_transient(&self, id: FieldId, generation: u64) {
        let mut inner = self.lock();
        if let Some(path) = inner.session.locate_field(id)
            && let Ok(state) = inner.session.state_at_mut(path)
            && state.generation == generation
        {
            state.transient_input = None;
        }
    }

    /// Look up one atomic alteration name. Failures are notified and
    /// collapse to `None`; they never abort sibling lookups.
    async fn fetch_record(&self, alteration: &str) -> Option<AnnotatedAlterationRecord> {
        let result = self
            .annotator
            .resolve(self.config.reference_genome, alteration, &self.gene)
            .await;
        if let Err(err) = &result {
            self.notifier
                .notify(NotificationKind::Error, &err.to_string());
        }
        result.log_and_continue().flatten()
    }

    /// Resolve a batch of names concurrently, preserving call order in
    /// the result. One lookup per name; no cap, no request coalescing.
    async fn fetch_batch(
        &self,
        names: Vec<String>,
    ) -> Vec<(String, Option<AnnotatedAlterationRecord>)> {
        let lookups = names.into_iter().map(|name| async move {
            let record = self.fetch_record(&name).await;
            (name, record)
        });
        join_all(lookups).await
    }
}

fn fetch_kind(path: FieldPath) -> FetchKind {
    match path {
        FieldPath::Alteration(_) => FetchKind::Alteration,
        FieldPath::Excluding { .. } => FetchKind::Excluding,
    }
}

fn display_name(shared_name: &str, alteration: &str) -> String {
    if shared_name.is_empty() {
        alteration.to_string()
    } else {
        shared_name.to_string()
    }
}

fn abort_timer(timers: &mut HashMap<FieldId, (u64, JoinHandle<()>)>, id: FieldId) {
    if let Some((_, handle)) = timers.remove(&id) {
        handle.abort();
    }
}

fn resolved_only(
    batch: Vec<(String, Option<AnnotatedAlterationRecord>)>,
) -> Vec<(String, AnnotatedAlterationRecord)> {
    batch
        .into_iter()
        .filter_map(|(name, record)| record.map(|record| (name, record)))
        .collect()
}

fn build_exclusion_states(
    session: &mut ModalSession,
    resolved: Vec<(String, AnnotatedAlterationRecord)>,
) -> Vec<AlterationState> {
    resolved
        .into_iter()
        .map(|(name, record)| {
            let display = name.clone();
            session.new_state(name, display, "", Vec::new(), Some(record))
        })
        .collect()
}
