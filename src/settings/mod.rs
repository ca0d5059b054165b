//! The settings core: draft state, patch minimization, and the save
//! orchestrator that reconciles drafts with the remote service.

pub mod completion;
pub mod draft;
pub mod minimize;
pub mod session;

pub use completion::{CompletionAvailability, CompletionBridge};
pub use draft::SettingsDraft;
pub use minimize::minimize;
pub use session::{
    Alert, CompletionAffordance, SaveOutcome, SaveState, SettingsSession,
};
