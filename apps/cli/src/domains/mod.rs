pub mod diagnostics;
pub mod hash;
pub mod preview;
pub mod scan;
