//! varcura Core
//!
//! Core curation engine for genomic alteration expressions. This crate
//! parses free-text alteration descriptions (e.g. `V600E`,
//! `V600E/K [Class 2] {excluding V600E}`) into structured fragments,
//! de-duplicates them against an editable session list, resolves each
//! atomic alteration against an external annotation service, and
//! reconciles the results back into the session while suppressing stale
//! responses from superseded edits.
//!
//! UI rendering, persistence, and the annotation service itself are out
//! of scope; they plug in through the [`Annotator`] and
//! [`NotificationSink`] traits.

pub mod annotate;
pub mod config;
pub mod dedup;
pub mod engine;
pub mod error;
pub mod notify;
pub mod parser;
pub mod reference;
pub mod result;
pub mod session;

// Re-export commonly used types
pub use annotate::{AnnotatedAlterationRecord, Annotator, GeneContext, ReferenceGenome};
pub use config::{DEFAULT_DEBOUNCE_MS, EngineConfig};
pub use dedup::{exclusion_set_exists, filter_duplicates, is_duplicate};
pub use engine::{DUPLICATE_NOTICE, ReconciliationEngine};
pub use error::{CurationError, ErrorKind};
pub use notify::{BufferingNotifier, NotificationKind, NotificationSink, TracingNotifier};
pub use parser::{
    ParsedAlterationFragment, expand_alteration_name, full_alteration_name, parse_alteration_name,
};
pub use reference::{
    ParsedReference, REFERENCE_IDENTIFIERS, ReferenceSegment, parse_text_for_references,
    split_references,
};
pub use result::{Result, ResultExt};
pub use session::{
    AlterationState, CategoryFlag, FetchKind, FieldId, FieldPath, ModalSession,
};

/// Initialize the tracing subscriber for logging
///
/// Safe to call more than once; later calls are ignored, so embedders and
/// test binaries can both use it.
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("varcura=info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true),
        )
        .try_init();
}
