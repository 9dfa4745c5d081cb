//! Database entities for the PrimeFire API.

pub mod country;
pub mod curriculum;
pub mod employee;
pub mod employee_role;
pub mod hardware_item;
pub mod job;
pub mod license;
pub mod module;
pub mod module_permission;
pub mod role;
pub mod ticket;
pub mod ticket_attachment;
pub mod ticket_message;
