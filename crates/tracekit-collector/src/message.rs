//! Trace message model.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Severity class of a trace message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TraceKind {
    /// Plain diagnostic message.
    Trace,
    /// Something unexpected that the system recovered from.
    Warning,
    /// An operation failed.
    Error,
    /// A caught error value with its source chain.
    Exception,
}

impl TraceKind {
    /// Three-letter tag used in rendered output.
    #[must_use]
    pub fn short_str(self) -> &'static str {
        match self {
            Self::Trace => "Trc",
            Self::Warning => "War",
            Self::Error => "Err",
            Self::Exception => "Exc",
        }
    }

    /// Stable index for per-kind lookup tables.
    #[must_use]
    pub(crate) fn index(self) -> usize {
        match self {
            Self::Trace => 0,
            Self::Warning => 1,
            Self::Error => 2,
            Self::Exception => 3,
        }
    }

    /// All kinds, in severity order.
    pub const ALL: [Self; 4] = [Self::Trace, Self::Warning, Self::Error, Self::Exception];
}

impl std::fmt::Display for TraceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.short_str())
    }
}

/// A collected trace message: severity, creation time, text and an
/// optional tag consumers can filter on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceMessage {
    /// Severity class.
    pub kind: TraceKind,
    /// Wall-clock creation time.
    pub created: SystemTime,
    /// The message text.
    pub text: String,
    /// Optional filter tag.
    pub filter: Option<String>,
}

impl TraceMessage {
    /// Build a message stamped with the current wall-clock time.
    #[must_use]
    pub fn new(kind: TraceKind, text: impl Into<String>, filter: Option<String>) -> Self {
        Self {
            kind,
            created: SystemTime::now(),
            text: text.into(),
            filter,
        }
    }
}

impl std::fmt::Display for TraceMessage {
    /// Renders as `Trc 12:34:56.789 text`, matching the collector's log
    /// line format.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let since_epoch = self
            .created
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let millis = since_epoch.subsec_millis();
        let day_seconds = since_epoch.as_secs() % 86_400;
        let (hours, minutes, seconds) =
            (day_seconds / 3600, day_seconds % 3600 / 60, day_seconds % 60);
        write!(
            f,
            "{} {hours:02}:{minutes:02}:{seconds:02}.{millis:03} {}",
            self.kind, self.text
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_strings_are_three_letters() {
        for kind in TraceKind::ALL {
            assert_eq!(kind.short_str().len(), 3);
        }
    }

    #[test]
    fn display_includes_kind_and_text() {
        let message = TraceMessage::new(TraceKind::Warning, "low disk", None);
        let rendered = message.to_string();
        assert!(rendered.starts_with("War "));
        assert!(rendered.ends_with(" low disk"));
    }

    #[test]
    fn filter_tag_is_preserved() {
        let message = TraceMessage::new(TraceKind::Trace, "t", Some("net".to_owned()));
        assert_eq!(message.filter.as_deref(), Some("net"));
    }
}
