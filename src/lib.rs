pub mod app;
pub mod assets;
pub mod audio;
pub mod clock;
pub mod config;
pub mod entity;
pub mod filters;
pub mod generators;
pub mod gesture;
pub mod level;
pub mod logging;
pub mod media;
pub mod physics;
pub mod pulse;
pub mod render;
pub mod scheduler;
pub mod session;
pub mod stage;
pub mod terminal;
