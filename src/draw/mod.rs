pub mod commands;
pub mod composite;
pub mod controller;
pub mod engine;
pub mod history;
pub mod input;
pub mod keys;
pub mod magnifier;
pub mod messages;
pub mod model;
pub mod render;
pub mod renderer;
pub mod save;
pub mod settings;
pub mod settings_store;
pub mod software;
pub mod styles;
pub mod toast;
pub mod widen;
