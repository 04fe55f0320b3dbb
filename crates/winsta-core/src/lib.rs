pub mod config;
pub mod logging;

// Copy engine
pub mod checksum;
pub mod transfer;

// Collaborators around the copy
pub mod control;
pub mod fetch;
pub mod installer;
pub mod platform;
pub mod release;
pub mod storage;
pub mod workdir;

pub mod pipeline;
