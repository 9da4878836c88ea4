pub mod key_set_service;
pub mod rotation_service;
