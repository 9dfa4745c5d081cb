//! HTTP handlers, one module per API domain.

pub mod common;
pub mod countries;
pub mod curriculums;
pub mod employees;
pub mod hardware;
pub mod jobs;
pub mod licenses;
pub mod modules;
pub mod permissions;
pub mod roles;
pub mod sync;
pub mod ticket_attachments;
pub mod ticket_messages;
pub mod tickets;
