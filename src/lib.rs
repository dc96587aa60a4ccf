//! Botflow: WhatsApp-bot workflows, their conditional evaluation, and the
//! admin client around them.

pub mod api;
pub mod config;
pub mod error;
pub mod live;
pub mod preview;
pub mod state;
pub mod workflow;
