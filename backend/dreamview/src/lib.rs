//! Dream card view service.
//!
//! Reads one crowdfunding dream from the dream raiser contract field by field,
//! merges the results into a single view and decides which of fund / withdraw
//! the current viewer may use.
//!
//! | Module         | Role                                                   |
//! |----------------|--------------------------------------------------------|
//! | [`format`]     | truncation, fixed-point amounts, percentages           |
//! | [`snapshot`]   | per-field load state and the derived view              |
//! | [`aggregator`] | activation-guarded merging of field reads              |
//! | [`controller`] | permission gate and `Idle` / `Submitting` machine      |
//! | [`card`]       | the task tying the above to a [`source::DreamSource`]  |
//! | [`rpc`]        | JSON-RPC `DreamSource`                                  |
//! | [`api`]        | REST surface for the presentation layer                |

pub mod abi;
pub mod aggregator;
pub mod api;
pub mod card;
pub mod config;
pub mod controller;
pub mod errors;
pub mod format;
pub mod rpc;
pub mod snapshot;
pub mod source;
