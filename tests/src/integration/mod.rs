//! # Integration Scenarios
//!
//! | Module | Subsystems |
//! |--------|------------|
//! | `session_anchor` | lc-01 → anchor queue → lc-02 → lc-01 |
//! | `proofs` | lc-01 session roots → lc-03 validation and settlement |
//! | `event_flow` | everything, observed from the shared bus |

#[cfg(test)]
mod fixtures;

#[cfg(test)]
mod event_flow;
#[cfg(test)]
mod proofs;
#[cfg(test)]
mod session_anchor;
