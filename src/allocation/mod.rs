//! Allocation strategies.
//!
//! Two alternative strategies over the same resolved configuration; neither
//! depends on the other.
//!
//! - [`BatchAllocator`]: all instances solved jointly, minimizing the
//!   workload-fairness objective
//! - [`SequentialAllocator`]: instances solved one at a time as
//!   feasibility problems, spreading work through an [`ExclusionHistory`]
//!
//! Both build their models through [`AllocationModelBuilder`] and return an
//! [`AssignmentTable`](crate::models::AssignmentTable) that the compliance
//! validator accepts without errors.

mod batch;
mod kpi;
mod model;
mod sequential;

pub use batch::{BatchAllocator, BatchOutcome};
pub use kpi::WorkloadKpi;
pub use model::AllocationModelBuilder;
pub use sequential::{
    ExclusionEntry, ExclusionHistory, ExemptionSet, SequentialAllocator, SequentialOutcome,
};
