//! Common utilities shared by the library and the command-line tool.
//!
//! - **`data_loader`**: Parses Matrix Market coordinate files (real or complex,
//!   general or symmetric storage) into sparse [`crate::Operator`] values.

pub mod data_loader;
