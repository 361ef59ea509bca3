//! Plugin instance trait and the data the bridge reads from it.
//!
//! Format-specific loaders own the actual instances; the relay, control
//! server and supervisors only see them through [`PluginInstance`].

use crate::post_event::PostEventBuffer;
use crate::remote::RemoteLink;
use atomic_float::AtomicF32;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PluginFormat {
    Internal,
    Ladspa,
    Dssi,
    Lv2,
    Vst,
    Sf2,
}

impl PluginFormat {
    /// DSSI UIs select bank/program through MIDI bank-select and
    /// program-change packets on the note path instead of `MidiProgram`.
    pub fn requires_midi_program_note_trick(self) -> bool {
        matches!(self, PluginFormat::Dssi)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterKind {
    Input,
    Output,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterHints {
    pub automatable: bool,
    pub boolean: bool,
    pub integer: bool,
    pub logarithmic: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterData {
    pub name: String,
    pub kind: ParameterKind,
    pub hints: ParameterHints,
    pub min_value: f64,
    pub max_value: f64,
    pub default_value: f64,
}

impl ParameterData {
    pub fn new(name: impl Into<String>, kind: ParameterKind) -> Self {
        Self {
            name: name.into(),
            kind,
            hints: ParameterHints::default(),
            min_value: 0.0,
            max_value: 1.0,
            default_value: 0.0,
        }
    }

    pub fn input(name: impl Into<String>) -> Self {
        Self::new(name, ParameterKind::Input)
    }

    pub fn output(name: impl Into<String>) -> Self {
        Self::new(name, ParameterKind::Output)
    }

    pub fn automatable(mut self) -> Self {
        self.hints.automatable = true;
        self
    }

    pub fn range(mut self, min: f64, max: f64, default: f64) -> Self {
        self.min_value = min;
        self.max_value = max;
        self.default_value = default.clamp(min, max);
        self
    }

    /// Output parameters republished to remote UIs every relay cycle.
    pub fn is_automatable_output(&self) -> bool {
        self.kind == ParameterKind::Output && self.hints.automatable
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min_value, self.max_value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MidiProgram {
    pub bank: u32,
    pub program: u32,
    pub name: String,
}

/// Lock-free peak levels written by the audio thread.
pub struct PluginPeaks {
    in1: AtomicF32,
    in2: AtomicF32,
    out1: AtomicF32,
    out2: AtomicF32,
}

impl PluginPeaks {
    pub fn new() -> Self {
        Self {
            in1: AtomicF32::new(0.0),
            in2: AtomicF32::new(0.0),
            out1: AtomicF32::new(0.0),
            out2: AtomicF32::new(0.0),
        }
    }

    #[inline]
    pub fn set(&self, in1: f32, in2: f32, out1: f32, out2: f32) {
        self.in1.store(in1, Ordering::Relaxed);
        self.in2.store(in2, Ordering::Relaxed);
        self.out1.store(out1, Ordering::Relaxed);
        self.out2.store(out2, Ordering::Relaxed);
    }

    /// `[in1, in2, out1, out2]`
    #[inline]
    pub fn get(&self) -> [f32; 4] {
        [
            self.in1.load(Ordering::Relaxed),
            self.in2.load(Ordering::Relaxed),
            self.out1.load(Ordering::Relaxed),
            self.out2.load(Ordering::Relaxed),
        ]
    }
}

impl Default for PluginPeaks {
    fn default() -> Self {
        Self::new()
    }
}

/// What the bridge needs from a loaded plugin.
///
/// Shared across the relay, control server and supervisor threads, so all
/// mutation goes through interior mutability.
pub trait PluginInstance: Send + Sync {
    /// Negative ids mark an instance that is not (or no longer) usable.
    fn id(&self) -> i32;

    fn name(&self) -> &str;

    fn filename(&self) -> &Path;

    fn format(&self) -> PluginFormat;

    fn post_events(&self) -> &PostEventBuffer;

    fn parameter_count(&self) -> usize;

    fn parameter_data(&self, index: usize) -> Option<&ParameterData>;

    /// Current value, or 0.0 for an out-of-range index.
    fn parameter_value(&self, index: usize) -> f64;

    fn set_parameter_value(&self, index: usize, value: f64);

    fn program_count(&self) -> usize;

    /// -1 when no program is selected.
    fn current_program(&self) -> i32;

    fn set_current_program(&self, index: i32);

    fn midi_program_count(&self) -> usize;

    fn midi_program(&self, index: usize) -> Option<&MidiProgram>;

    /// -1 when no MIDI program is selected.
    fn current_midi_program(&self) -> i32;

    fn set_current_midi_program(&self, index: i32);

    /// Bridged UI listening for this plugin's control traffic.
    fn remote_ui(&self) -> &RemoteLink;

    fn peaks(&self) -> &PluginPeaks;
}
