pub mod orchestrator;
pub mod state;


pub use orchestrator::{CancelHandle, ScanError, ScanOrchestrator};
pub use state::{ScanEvent, ScanPhase, ScanState};
