//! Identity provider descriptions.

pub mod google;
pub mod okta;
