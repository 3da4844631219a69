//! Operation, task and pipeline layers.

pub mod operation;
pub mod payload;
pub mod runner;
pub mod task;

pub use operation::{FnOperation, Operation, OperationKind};
pub use payload::Payload;
pub use runner::{Pipeline, PipelineBuilder, PipelineState};
pub use task::{
    AnyPayload, ExtractData, ExtractDataTask, FormatData, FormatDataTask, OperationTask, Task,
    TaskContract,
};
