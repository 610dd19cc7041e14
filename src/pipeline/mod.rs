//! Message pipeline — the boundary between chat and resolution.
//!
//! Owns command routing, the notice lifecycle, artifact naming, the
//! delivery size ceiling and metrics updates. The resolver below it
//! only ever sees a `DocumentReference` and returns bytes or a typed
//! failure.

pub mod artifact;
pub mod processor;
pub mod templates;

pub use processor::MessageProcessor;
