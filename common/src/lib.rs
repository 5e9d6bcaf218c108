//! Request and response models shared by the tiling service and its clients.

pub mod jobs;
pub mod model;
pub mod requests;
