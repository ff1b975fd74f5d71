pub mod result;
pub mod verification;

pub use result::{ExecutionResult, TestStatus};
pub use verification::{
    PlannedTest, RenderedCommands, Rendering, TestDefinition, TestId, VerificationBlock,
};
