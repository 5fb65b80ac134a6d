//! Ledgerflow Engine
//!
//! This crate executes flows in response to business events.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        EventRunner                          │
//! │  - owns mpsc channel of FlowEventContext                    │
//! │  - start(cancel) fans every event out                       │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        FlowEngine                           │
//! │  - execute_flows_for_event(event, mode) → run ids           │
//! │  - execute_flow_by_id(org, flow, mode, event) → step log    │
//! │  - resume(run_id) continues runs suspended at waits         │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          walk()                             │
//! │  - depth-first traversal from a matched trigger             │
//! │  - first-match switches via the condition evaluator         │
//! │  - dispatch requests and resume points collected, not sent  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Side effects (sequence enrollment, wake-up scheduling, persistence) go
//! through the [`ActionDispatcher`], [`Scheduler`] and store traits.
//!
//! # Usage
//!
//! ```ignore
//! use ledgerflow_engine::{EngineConfig, ExecutionMode, FlowEngine, LoggingDispatcher};
//! use ledgerflow_store::MemoryStore;
//!
//! let store = Arc::new(MemoryStore::new());
//! let engine = FlowEngine::new(
//!     EngineConfig::default(),
//!     store.clone(),
//!     store,
//!     Arc::new(LoggingDispatcher),
//! );
//!
//! let run_ids = engine.execute_flows_for_event(&event, ExecutionMode::Live).await?;
//! ```

pub mod condition;
mod config;
mod dispatch;
mod engine;
mod error;
mod events;
mod mode;
mod recorder;
mod resume;
mod runner;
mod selector;
mod walker;

pub use config::EngineConfig;
pub use dispatch::{
  ActionDispatcher, DispatchError, DispatchRequest, LoggingDispatcher, LoggingScheduler,
  Scheduler, SchedulerError,
};
pub use engine::FlowEngine;
pub use error::EngineError;
pub use events::{ChannelNotifier, ExecutionNotifier, NoopNotifier, RunEvent};
pub use mode::ExecutionMode;
pub use recorder::RunRecorder;
pub use runner::EventRunner;
pub use selector::select_flows;
pub use walker::{WalkState, drain_deferred, walk, walk_downstream};
