pub mod blueprint;
pub mod client;
pub mod execution;
pub mod recommendation;
pub mod role;
pub mod structuring;
pub mod workflow;

pub use blueprint::{Blueprint, BlueprintStatus, TargetAllocation};
pub use client::{Client, RiskProfile};
pub use execution::{ExecutionStatus, ExecutionTicket};
pub use recommendation::{Recommendation, RecommendationStatus};
pub use role::{Action, Role};
pub use structuring::{Complexity, StructuringCase, StructuringStatus};
pub use workflow::{Advance, ParseStatusError, Workflow};
