//! License knowledge shared by the analyzers and the auditor.
//!
//! - [`detect`]: finds a license file in a package directory and maps its text
//!   to an SPDX-style identifier by phrase matching.
//! - [`catalog`]: static message and suggestion tables used when reporting
//!   audit issues.

pub mod catalog;
pub mod detect;
