/// Defines the data structures for log records.
pub mod logrecord;
/// Implements a local logger with TTY, file and `tracing` output.
pub mod loggerlocal;
