//! Session lifecycle: state machine, buffers, and the recorder driving them

mod recorder;
mod state;

pub use recorder::Recorder;
pub use state::{ClientMetadata, Session, SessionSnapshot, SessionState};
