//! Toolkit-less UI used by the `ui-bridge` binary and in tests.
//!
//! Keeps the state a real editor would display and logs every change.

use crate::error::Result;
use crate::ui::{PluginUi, UiWindow};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Default)]
pub struct HeadlessUi {
    title: String,
    initialized: bool,
    parameters: BTreeMap<i32, f32>,
    program: Option<i32>,
    midi_program: Option<(i32, i32)>,
    held_notes: BTreeSet<i32>,
}

impl HeadlessUi {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn parameter(&self, index: i32) -> Option<f32> {
        self.parameters.get(&index).copied()
    }

    pub fn program(&self) -> Option<i32> {
        self.program
    }

    pub fn midi_program(&self) -> Option<(i32, i32)> {
        self.midi_program
    }

    pub fn held_notes(&self) -> impl Iterator<Item = i32> + '_ {
        self.held_notes.iter().copied()
    }
}

impl PluginUi for HeadlessUi {
    fn init(&mut self) -> Result<()> {
        tracing::info!("{}: UI ready", self.title);
        self.initialized = true;
        Ok(())
    }

    fn close(&mut self) {
        tracing::info!("{}: UI closed", self.title);
        self.initialized = false;
    }

    fn update_parameter(&mut self, index: i32, value: f32) {
        tracing::info!("{}: parameter {} = {}", self.title, index, value);
        self.parameters.insert(index, value);
    }

    fn update_program(&mut self, index: i32) {
        tracing::info!("{}: program {}", self.title, index);
        self.program = Some(index);
    }

    fn update_midi_program(&mut self, bank: i32, program: i32) {
        tracing::info!("{}: MIDI program {}:{}", self.title, bank, program);
        self.midi_program = Some((bank, program));
    }

    fn send_note_on(&mut self, note: i32, velocity: i32) {
        tracing::debug!("{}: note on {} ({})", self.title, note, velocity);
        self.held_notes.insert(note);
    }

    fn send_note_off(&mut self, note: i32) {
        tracing::debug!("{}: note off {}", self.title, note);
        self.held_notes.remove(&note);
    }

    fn widget(&self) -> Option<u64> {
        None
    }

    fn is_resizable(&self) -> bool {
        true
    }
}

#[derive(Debug, Default)]
pub struct HeadlessWindow {
    visible: bool,
    size: (i32, i32),
    quit_requested: bool,
}

impl HeadlessWindow {
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn size(&self) -> (i32, i32) {
        self.size
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }
}

impl UiWindow for HeadlessWindow {
    fn show(&mut self) {
        self.visible = true;
    }

    fn hide(&mut self) {
        self.visible = false;
    }

    fn resize(&mut self, width: i32, height: i32) {
        self.size = (width, height);
    }

    fn quit(&mut self) {
        tracing::debug!("Quit requested");
        self.visible = false;
        self.quit_requested = true;
    }
}
