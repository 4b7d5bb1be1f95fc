//! Execution report of a repair.
//!
//! Work items return their entries instead of sharing the report; the
//! orchestrator appends them in submission order, so two runs over the same
//! data produce the same report.

use std::fmt;

use serde::Serialize;

/// Errors and unresolved conflicts.
pub const LEVEL_ERROR: u32 = 0;
/// Writes to either side.
pub const LEVEL_CHANGE: u32 = 100;
/// Differences left alone because of configuration.
pub const LEVEL_SKIP: u32 = 200;
/// Resources found identical on both sides.
pub const LEVEL_NO_CHANGE: u32 = 300;

/// One of the two replicated storages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Local,
    Remote,
}

impl Side {
    /// The other side.
    pub fn opposite(self) -> Side {
        match self {
            Side::Local => Side::Remote,
            Side::Remote => Side::Local,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Local => f.write_str("local"),
            Side::Remote => f.write_str("remote"),
        }
    }
}

/// What happened to one document or attachment.
///
/// Names follow the side that was written: `ForcePutRemote` means the
/// conflict went to local and the remote was overwritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    PutRemote,
    PutLocal,
    PostRemote,
    DeleteRemote,
    DeleteLocal,
    NoChange,
    FalseConflict,
    SkipLocalCreation,
    SkipRemoteCreation,
    SkipLocalModification,
    SkipRemoteModification,
    SkipLocalDeletion,
    SkipRemoteDeletion,
    ForcePutLocal,
    ForcePutRemote,
    ForceDeleteLocal,
    ForceDeleteRemote,
    SkipConflict,
    UnresolvedConflict,
    UnexpectedLocalAttachment,
    UnexpectedRemoteAttachment,
    UnexpectedError,

    PutRemoteAttachment,
    PutLocalAttachment,
    DeleteRemoteAttachment,
    DeleteLocalAttachment,
    NoChangeAttachment,
    FalseConflictAttachment,
    SkipLocalAttachmentCreation,
    SkipRemoteAttachmentCreation,
    SkipLocalAttachmentModification,
    SkipRemoteAttachmentModification,
    SkipLocalAttachmentDeletion,
    SkipRemoteAttachmentDeletion,
    ForcePutLocalAttachment,
    ForcePutRemoteAttachment,
    ForceDeleteLocalAttachment,
    ForceDeleteRemoteAttachment,
    SkipConflictAttachment,
    UnresolvedAttachmentConflict,
}

impl Outcome {
    /// Verbosity level of this outcome.
    pub fn level(self) -> u32 {
        use Outcome::*;
        match self {
            UnresolvedConflict
            | UnexpectedLocalAttachment
            | UnexpectedRemoteAttachment
            | UnexpectedError
            | UnresolvedAttachmentConflict => LEVEL_ERROR,

            PutRemote | PutLocal | PostRemote | DeleteRemote | DeleteLocal | ForcePutLocal
            | ForcePutRemote | ForceDeleteLocal | ForceDeleteRemote | PutRemoteAttachment
            | PutLocalAttachment | DeleteRemoteAttachment | DeleteLocalAttachment
            | ForcePutLocalAttachment | ForcePutRemoteAttachment | ForceDeleteLocalAttachment
            | ForceDeleteRemoteAttachment => LEVEL_CHANGE,

            SkipLocalCreation
            | SkipRemoteCreation
            | SkipLocalModification
            | SkipRemoteModification
            | SkipLocalDeletion
            | SkipRemoteDeletion
            | SkipConflict
            | SkipLocalAttachmentCreation
            | SkipRemoteAttachmentCreation
            | SkipLocalAttachmentModification
            | SkipRemoteAttachmentModification
            | SkipLocalAttachmentDeletion
            | SkipRemoteAttachmentDeletion
            | SkipConflictAttachment => LEVEL_SKIP,

            NoChange | FalseConflict | NoChangeAttachment | FalseConflictAttachment => {
                LEVEL_NO_CHANGE
            }
        }
    }

    pub fn is_error(self) -> bool {
        self.level() == LEVEL_ERROR
    }

    /// Put outcome for a write to `side`.
    pub(crate) fn put(side: Side, forced: bool, attachment: bool) -> Outcome {
        use Outcome::*;
        match (side, forced, attachment) {
            (Side::Local, false, false) => PutLocal,
            (Side::Remote, false, false) => PutRemote,
            (Side::Local, true, false) => ForcePutLocal,
            (Side::Remote, true, false) => ForcePutRemote,
            (Side::Local, false, true) => PutLocalAttachment,
            (Side::Remote, false, true) => PutRemoteAttachment,
            (Side::Local, true, true) => ForcePutLocalAttachment,
            (Side::Remote, true, true) => ForcePutRemoteAttachment,
        }
    }

    /// Delete outcome for a removal from `side`.
    pub(crate) fn delete(side: Side, forced: bool, attachment: bool) -> Outcome {
        use Outcome::*;
        match (side, forced, attachment) {
            (Side::Local, false, false) => DeleteLocal,
            (Side::Remote, false, false) => DeleteRemote,
            (Side::Local, true, false) => ForceDeleteLocal,
            (Side::Remote, true, false) => ForceDeleteRemote,
            (Side::Local, false, true) => DeleteLocalAttachment,
            (Side::Remote, false, true) => DeleteRemoteAttachment,
            (Side::Local, true, true) => ForceDeleteLocalAttachment,
            (Side::Remote, true, true) => ForceDeleteRemoteAttachment,
        }
    }

    /// Skip outcome for an unchecked change made on `side`.
    pub(crate) fn skip(side: Side, change: Change, attachment: bool) -> Outcome {
        use Outcome::*;
        match (side, change, attachment) {
            (Side::Local, Change::Creation, false) => SkipLocalCreation,
            (Side::Remote, Change::Creation, false) => SkipRemoteCreation,
            (Side::Local, Change::Modification, false) => SkipLocalModification,
            (Side::Remote, Change::Modification, false) => SkipRemoteModification,
            (Side::Local, Change::Deletion, false) => SkipLocalDeletion,
            (Side::Remote, Change::Deletion, false) => SkipRemoteDeletion,
            (Side::Local, Change::Creation, true) => SkipLocalAttachmentCreation,
            (Side::Remote, Change::Creation, true) => SkipRemoteAttachmentCreation,
            (Side::Local, Change::Modification, true) => SkipLocalAttachmentModification,
            (Side::Remote, Change::Modification, true) => SkipRemoteAttachmentModification,
            (Side::Local, Change::Deletion, true) => SkipLocalAttachmentDeletion,
            (Side::Remote, Change::Deletion, true) => SkipRemoteAttachmentDeletion,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::String(name)) => f.write_str(&name),
            _ => write!(f, "{:?}", self),
        }
    }
}

/// Kind of change a side made since the last synchronization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Creation,
    Modification,
    Deletion,
}

/// One report line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    pub outcome: Outcome,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ReportEntry {
    pub fn document(outcome: Outcome, id: impl Into<String>) -> Self {
        Self {
            outcome,
            id: id.into(),
            attachment: None,
            message: None,
        }
    }

    pub fn attachment(outcome: Outcome, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            outcome,
            id: id.into(),
            attachment: Some(name.into()),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl fmt::Display for ReportEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.outcome, self.id)?;
        if let Some(name) = &self.attachment {
            write!(f, " {}", name)?;
        }
        if let Some(message) = &self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

/// Ordered log of the outcomes of one repair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    level: u32,
    entries: Vec<ReportEntry>,
    has_error: bool,
}

impl Report {
    /// An empty report. `None` records errors and changes only.
    pub fn new(level: Option<u32>) -> Self {
        Self {
            level: level.unwrap_or(LEVEL_CHANGE),
            entries: Vec::new(),
            has_error: false,
        }
    }

    /// The verbosity threshold in use.
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Append an entry if its level is within the threshold.
    pub fn record(&mut self, entry: ReportEntry) {
        if entry.outcome.is_error() {
            self.has_error = true;
        }
        if entry.outcome.level() <= self.level {
            self.entries.push(entry);
        }
    }

    pub fn extend(&mut self, entries: impl IntoIterator<Item = ReportEntry>) {
        for entry in entries {
            self.record(entry);
        }
    }

    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    /// `(outcome, id, attachment)` triples, handy for assertions.
    pub fn summary(&self) -> Vec<(Outcome, &str, Option<&str>)> {
        self.entries
            .iter()
            .map(|e| (e.outcome, e.id.as_str(), e.attachment.as_deref()))
            .collect()
    }

    /// Entries about one document id.
    pub fn for_id<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a ReportEntry> + 'a {
        self.entries.iter().filter(move |e| e.id == id)
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.entries.iter().filter(|e| e.outcome == outcome).count()
    }

    /// Whether an error-level outcome was seen.
    pub fn has_error(&self) -> bool {
        self.has_error
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "{}", entry)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_filters_entries() {
        let mut report = Report::new(None);
        report.record(ReportEntry::document(Outcome::NoChange, "a"));
        report.record(ReportEntry::document(Outcome::SkipLocalCreation, "b"));
        report.record(ReportEntry::document(Outcome::PutRemote, "c"));
        report.record(ReportEntry::attachment(Outcome::UnresolvedAttachmentConflict, "d", "x"));

        assert_eq!(
            report.summary(),
            vec![
                (Outcome::PutRemote, "c", None),
                (Outcome::UnresolvedAttachmentConflict, "d", Some("x")),
            ]
        );
        assert!(report.has_error());
    }

    #[test]
    fn test_full_verbosity() {
        let mut report = Report::new(Some(LEVEL_NO_CHANGE));
        report.extend([
            ReportEntry::document(Outcome::NoChange, "a"),
            ReportEntry::attachment(Outcome::NoChangeAttachment, "a", "x"),
        ]);
        assert_eq!(report.len(), 2);
        assert_eq!(report.for_id("a").count(), 2);
        assert_eq!(report.count(Outcome::NoChangeAttachment), 1);
        assert!(!report.has_error());
    }

    #[test]
    fn test_error_level_keeps_errors_only() {
        let mut report = Report::new(Some(LEVEL_ERROR));
        report.record(ReportEntry::document(Outcome::PutLocal, "a"));
        report.record(ReportEntry::document(Outcome::UnexpectedError, "b").with_message("boom"));
        assert_eq!(report.len(), 1);
        assert_eq!(report.to_string(), "unexpected-error b: boom\n");
    }

    #[test]
    fn test_outcome_names() {
        assert_eq!(Outcome::ForcePutRemoteAttachment.to_string(), "force-put-remote-attachment");
        assert_eq!(Outcome::put(Side::Remote, true, false), Outcome::ForcePutRemote);
        assert_eq!(
            Outcome::skip(Side::Local, Change::Deletion, true),
            Outcome::SkipLocalAttachmentDeletion
        );
        assert_eq!(Side::Local.opposite(), Side::Remote);
    }
}
