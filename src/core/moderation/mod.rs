// Core moderation module - hierarchy gate and the moderation log.
// Following the same pattern as the tags module.

pub mod moderation_models;
pub mod moderation_service;

pub use moderation_models::*;
pub use moderation_service::*;
