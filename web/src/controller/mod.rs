pub(crate) mod health_check_controller;
pub mod oauth_controller;
pub(crate) mod session_controller;
pub mod webauthn_controller;
