pub mod launch;

pub use launch::{launch_profile_context, BrowserSession};
