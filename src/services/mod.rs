//! Background services.

mod typing_sweep;

pub use typing_sweep::spawn_typing_sweeper;
