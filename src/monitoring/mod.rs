/*!
 * Diagnostics
 * Tracing setup for lock defect and contention reports
 */

mod tracer;

pub use tracer::init_tracing;

#[doc(hidden)]
pub use tracer::init_test_tracing;
