pub mod content;
pub mod execute;
pub mod plan;
pub mod walker;

pub use content::render_content;
pub use execute::{execute_plan, ApplyReport};
pub use plan::{plan, plan_entries, Action, ConflictPolicy, PlanEntry, PlanOptions};
pub use walker::{scan_files, SourceFile};
