//! Service layer: scoped commands and selectors over the shared store.

pub mod alignment;
pub mod engine;
pub mod outcome_tree;
pub mod picker;
pub mod report;
pub mod search;

pub use alignment::AlignmentService;
pub use engine::Engine;
pub use outcome_tree::OutcomeTreeService;
pub use picker::PickerService;
pub use report::{ReportService, UserPageLoader};
pub use search::{SearchController, SearchDispatch};
