//! Production workflow and tracking engine for composite part work orders.
//!
//! Work orders (ODL) move through a fixed sequence of work centers:
//! clean-room lamination, autoclave curing, NC machining, non-destructive
//! inspection, assembly, coating and final quality control. This crate
//! records department entry/exit/pause/resume events, derives each order's
//! lifecycle status from its event history, advances orders automatically
//! when a station is exited — transactionally, with optimistic concurrency
//! and bounded retry — and maintains cycle/wait/pause time metrics per
//! order and per part.
//!
//! The relational store, web surface, authentication and report generation
//! are external collaborators; persistence is reached only through the
//! repository traits in [`store`].

pub mod cache;
pub mod clock;
pub mod config;
pub mod domain;
pub mod metrics;
pub mod store;
pub mod tracking;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testutil;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::TrackingConfig;
pub use metrics::TimeMetricsService;
pub use store::{EventJournal, MemoryStore, Store};
pub use tracking::{NewEventRequest, RecordedEvent, TrackingService, TrackingStatus};
pub use workflow::{AutoTransferResult, TransferOptions, TransferValidation, WorkflowService};
