//! Convenience re-exports of the collector's public surface.

pub use crate::collector::{ListenerId, TraceCollector};
pub use crate::config::{CollectorConfig, CollectorConfigBuilder};
pub use crate::error::{CollectorError, CollectorResult};
pub use crate::message::{TraceKind, TraceMessage};
