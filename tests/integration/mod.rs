//! Integration tests for full gate runs
//!
//! Each test builds a throwaway project with guidance documents and drives
//! the library pipeline end to end.

pub mod extraction;
pub mod governance;
pub mod helpers;
pub mod routing;
pub mod scenarios;
