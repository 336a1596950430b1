//! Modal session state
//!
//! One `ModalSession` backs one open add/edit-mutation interaction: the
//! ordered list of alteration states (insertion order is display order and
//! is user-visible), the selected row, the exon-edit sub-mode, transient
//! fetch counters, and category-level flags and comment scoped to the whole
//! session. All mutation is synchronous; the reconciliation engine wraps a
//! session in a lock and never holds it across an await, so engine splices
//! and UI mutations are linearizable.
//!
//! Every editable slot carries a stable [`FieldId`] and a monotonically
//! increasing generation. Indices shift when fields expand or collapse, so
//! asynchronous results are applied by id and only when the generation they
//! captured is still the slot's current one.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::CurationError;
use crate::Result;
use crate::annotate::AnnotatedAlterationRecord;
use crate::parser::full_alteration_name;

/// Stable identity token of one editable field slot.
pub type FieldId = u64;

/// Address of an editable field as the UI sees it: a top-level alteration
/// row, or one exclusion slot inside a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPath {
    Alteration(usize),
    Excluding { alteration: usize, excluding: usize },
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldPath::Alteration(index) => write!(f, "alteration[{index}]"),
            FieldPath::Excluding {
                alteration,
                excluding,
            } => write!(f, "alteration[{alteration}].excluding[{excluding}]"),
        }
    }
}

/// Which of the two fetch families a resolution belongs to, mirrored into
/// the session's is-fetching flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    Alteration,
    Excluding,
}

/// Category-level flag attached to the whole mutation, not to any one
/// alteration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryFlag {
    pub id: Option<i64>,
    pub flag: String,
    pub name: String,
}

/// One curated alteration row (or exclusion slot). Exclusions are the same
/// shape nested one level deep; an exclusion never carries exclusions of
/// its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlterationState {
    pub id: FieldId,
    pub alteration: String,
    pub name: String,
    pub comment: String,
    pub excluding: Vec<AlterationState>,
    pub annotation: Option<AnnotatedAlterationRecord>,
    /// Literal text currently in the input box while its resolution is in
    /// flight; cleared exactly when that resolution completes.
    pub transient_input: Option<String>,
    /// Bumped on every edit. A resolution applies only if the generation
    /// it captured still matches.
    pub generation: u64,
}

impl AlterationState {
    fn blank(id: FieldId) -> Self {
        Self {
            id,
            alteration: String::new(),
            name: String::new(),
            comment: String::new(),
            excluding: Vec::new(),
            annotation: None,
            transient_input: None,
            generation: 0,
        }
    }

    /// The display string of this state without its comment, as used for
    /// duplicate pre-checks.
    pub fn name_without_comment(&self) -> String {
        let excluding: Vec<String> = self
            .excluding
            .iter()
            .map(|ex| ex.alteration.clone())
            .collect();
        full_alteration_name(&self.alteration, &self.name, &excluding, "")
    }
}

/// State of one open add/edit-mutation modal.
#[derive(Debug, Default)]
pub struct ModalSession {
    states: Vec<AlterationState>,
    selected_index: Option<usize>,
    show_exon_edit: bool,
    fetching_alteration: usize,
    fetching_excluding: usize,
    category_flags: Vec<CategoryFlag>,
    category_comment: String,
    next_field_id: FieldId,
}

impl ModalSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alteration_states(&self) -> &[AlterationState] {
        &self.states
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected_index
    }

    pub fn set_selected_index(&mut self, index: Option<usize>) {
        self.selected_index = index;
    }

    pub fn show_exon_edit(&self) -> bool {
        self.show_exon_edit
    }

    /// Toggling the exon-edit sub-mode always drops the row selection.
    pub fn set_show_exon_edit(&mut self, show: bool) {
        self.show_exon_edit = show;
        self.selected_index = None;
    }

    pub fn category_flags(&self) -> &[CategoryFlag] {
        &self.category_flags
    }

    pub fn set_category_flags(&mut self, flags: Vec<CategoryFlag>) {
        self.category_flags = flags;
    }

    pub fn category_comment(&self) -> &str {
        &self.category_comment
    }

    pub fn set_category_comment(&mut self, comment: impl Into<String>) {
        self.category_comment = comment.into();
    }

    pub fn is_fetching_alteration(&self) -> bool {
        self.fetching_alteration > 0
    }

    pub fn is_fetching_excluding(&self) -> bool {
        self.fetching_excluding > 0
    }

    pub(crate) fn begin_fetch(&mut self, kind: FetchKind) {
        match kind {
            FetchKind::Alteration => self.fetching_alteration += 1,
            FetchKind::Excluding => self.fetching_excluding += 1,
        }
    }

    pub(crate) fn end_fetch(&mut self, kind: FetchKind) {
        match kind {
            FetchKind::Alteration => {
                self.fetching_alteration = self.fetching_alteration.saturating_sub(1)
            }
            FetchKind::Excluding => {
                self.fetching_excluding = self.fetching_excluding.saturating_sub(1)
            }
        }
    }

    /// Sorted, lower-cased display names of all accepted alterations,
    /// comments ignored. Recomputed on demand; cheap duplicate pre-check
    /// for callers outside the modal.
    pub fn current_alteration_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .states
            .iter()
            .map(|state| state.name_without_comment().to_lowercase())
            .collect();
        names.sort();
        names
    }

    /// Allocate a fresh field identity token.
    pub(crate) fn allocate_field_id(&mut self) -> FieldId {
        self.next_field_id += 1;
        self.next_field_id
    }

    /// Build a new state with a fresh field id.
    pub(crate) fn new_state(
        &mut self,
        alteration: impl Into<String>,
        name: impl Into<String>,
        comment: impl Into<String>,
        excluding: Vec<AlterationState>,
        annotation: Option<AnnotatedAlterationRecord>,
    ) -> AlterationState {
        AlterationState {
            id: self.allocate_field_id(),
            alteration: alteration.into(),
            name: name.into(),
            comment: comment.into(),
            excluding,
            annotation,
            transient_input: None,
            generation: 0,
        }
    }

    /// Append a blank editable row and return its field id.
    pub fn add_blank_state(&mut self) -> FieldId {
        let id = self.allocate_field_id();
        self.states.push(AlterationState::blank(id));
        id
    }

    /// Append an already resolved state at the end of the list.
    pub fn push_state(&mut self, state: AlterationState) {
        self.states.push(state);
    }

    /// Replace the row at `index` with one or more states (1→N when a
    /// shorthand expression expanded). Fails when `index` is stale.
    pub fn splice_states(&mut self, index: usize, with: Vec<AlterationState>) -> Result<()> {
        if index >= self.states.len() {
            return Err(CurationError::unparsable_path(
                FieldPath::Alteration(index).to_string(),
            ));
        }
        let _ = self.states.splice(index..=index, with);
        Ok(())
    }

    /// Remove the row at `index`, keeping the selection coherent.
    pub fn remove_state(&mut self, index: usize) -> Result<AlterationState> {
        if index >= self.states.len() {
            return Err(CurationError::unparsable_path(
                FieldPath::Alteration(index).to_string(),
            ));
        }
        let removed = self.states.remove(index);
        match self.selected_index {
            Some(selected) if selected == index => self.selected_index = None,
            Some(selected) if selected > index => self.selected_index = Some(selected - 1),
            _ => {}
        }
        Ok(removed)
    }

    /// Resolve a UI path into its slot, immutable.
    pub fn state_at(&self, path: FieldPath) -> Result<&AlterationState> {
        let unparsable = || CurationError::unparsable_path(path.to_string());
        match path {
            FieldPath::Alteration(index) => self.states.get(index).ok_or_else(unparsable),
            FieldPath::Excluding {
                alteration,
                excluding,
            } => self
                .states
                .get(alteration)
                .and_then(|state| state.excluding.get(excluding))
                .ok_or_else(unparsable),
        }
    }

    /// Resolve a UI path into its slot, mutable.
    pub fn state_at_mut(&mut self, path: FieldPath) -> Result<&mut AlterationState> {
        let unparsable = || CurationError::unparsable_path(path.to_string());
        match path {
            FieldPath::Alteration(index) => self.states.get_mut(index).ok_or_else(unparsable),
            FieldPath::Excluding {
                alteration,
                excluding,
            } => self
                .states
                .get_mut(alteration)
                .and_then(|state| state.excluding.get_mut(excluding))
                .ok_or_else(unparsable),
        }
    }

    /// Find the current path of a field by its stable id. `None` when the
    /// field has been removed since the id was captured.
    pub fn locate_field(&self, id: FieldId) -> Option<FieldPath> {
        for (index, state) in self.states.iter().enumerate() {
            if state.id == id {
                return Some(FieldPath::Alteration(index));
            }
            for (ex_index, ex) in state.excluding.iter().enumerate() {
                if ex.id == id {
                    return Some(FieldPath::Excluding {
                        alteration: index,
                        excluding: ex_index,
                    });
                }
            }
        }
        None
    }

    /// Reset every session field to its initial value.
    pub fn reset(&mut self) {
        self.states.clear();
        self.selected_index = None;
        self.show_exon_edit = false;
        self.fetching_alteration = 0;
        self.fetching_excluding = 0;
        self.category_flags.clear();
        self.category_comment.clear();
    }
}
