pub mod error;
pub mod gig_service;
pub mod health;
pub mod hire_poller;
pub mod hire_service;
pub mod notification_service;
