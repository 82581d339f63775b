mod clock_scenarios;
mod config_persist;
mod runtime;
mod tui_render;
