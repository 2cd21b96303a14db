//! SLA bookkeeping for agent transfers and the periodic SLA processor.

mod processor;
mod service;

pub use processor::{
    SlaProcessor, SlaProcessorConfig, SlaProcessorDeps, SlaProcessorHandle, TickReport,
};
pub use service::SlaService;
