pub(crate) mod auth_event;
