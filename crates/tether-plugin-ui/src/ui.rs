//! UI toolkit seams.
//!
//! A bridged UI process pairs one [`PluginUi`] (the plugin's editor, per
//! toolkit) with one [`UiWindow`] (the toplevel it lives in). Both are driven
//! from the UI thread only.

use crate::error::Result;

pub trait PluginUi {
    fn init(&mut self) -> Result<()>;

    fn close(&mut self);

    fn update_parameter(&mut self, index: i32, value: f32);

    fn update_program(&mut self, index: i32);

    fn update_midi_program(&mut self, bank: i32, program: i32);

    /// Reflect a note played on the host side (keyboard widgets).
    fn send_note_on(&mut self, note: i32, velocity: i32);

    fn send_note_off(&mut self, note: i32);

    /// Native handle of the editor widget, if the toolkit has one.
    fn widget(&self) -> Option<u64>;

    fn is_resizable(&self) -> bool;
}

pub trait UiWindow {
    fn show(&mut self);

    fn hide(&mut self);

    fn resize(&mut self, width: i32, height: i32);

    /// Ask the toolkit loop to stop.
    fn quit(&mut self);
}
