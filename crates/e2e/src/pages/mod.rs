//! Page objects
//!
//! One canonical façade per page. Locators come from the bundle as ordered
//! fallback lists, so markup changes are fixture edits rather than code edits.

pub mod login;

pub use login::{LoginPage, PageOutcome, PageState, Region};
