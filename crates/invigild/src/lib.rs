//! invigild — exam proctoring daemon built around the invigil-core engine.
//!
//! Two dedicated detector threads feed the fusion engine: the pose loop
//! publishes the latest canonical face through a single-slot channel, and
//! the face loop cross-validates, scores, and drives the one-shot alert
//! machine. A fired alert triggers an asynchronous snapshot burst and a
//! report dispatch, and is journaled locally either way.
//!
//! Camera binding, on-screen drawing, and the detection models themselves
//! live behind the boundary traits in [`detector`]; [`replay`] provides the
//! built-in development implementations.

pub mod config;
pub mod detector;
pub mod engine;
pub mod replay;
pub mod report;
pub mod snapshot;
pub mod store;
