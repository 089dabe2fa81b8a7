//! Structured logging with optional file-based trace export.
//!
//! ```text
//! tracing → EnvFilter ─┬─▶ fmt layer → stderr
//!                      └─▶ tracing-opentelemetry → OtlpFileExporter → <trace_file>
//! ```
//!
//! The exporter writes one OTLP JSON document per line and rotates the file
//! at 10 MB, keeping three numbered backups.

mod exporter;
mod init;

pub use exporter::{file_tracer_provider, OtlpFileExporter, RotatingFile, MAX_BACKUPS, MAX_FILE_BYTES};
pub use init::init_tracing;
