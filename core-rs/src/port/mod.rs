/**
 * port module
 * Free port discovery with a shared resume cursor
 */

pub mod allocator;
pub mod cursor;
pub mod probe;

pub use allocator::PortAllocator;
pub use cursor::PortCursor;
pub use probe::{is_available, is_available_on_any};
