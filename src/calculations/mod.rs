pub mod criticality;
pub mod forward_pass;
pub mod variance;

pub use criticality::{CriticalityPass, CriticalityPolicy};
pub use forward_pass::{EarlyDates, ForwardPass, ForwardPassResult, PassStrategy};
