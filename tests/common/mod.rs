#![allow(dead_code, unused_imports)]

pub use buildmon_test_utils::builders;
pub use buildmon_test_utils::fake_runner;
pub use buildmon_test_utils::{init_tracing, with_timeout};
