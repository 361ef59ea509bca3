//! Host-side proxy for a plugin whose processing or UI lives in another process.

use crate::instance::{MidiProgram, ParameterData, PluginFormat, PluginInstance, PluginPeaks};
use crate::post_event::{PostEventBuffer, PostEventKind, MAX_POST_EVENTS};
use crate::protocol::BridgeConfig;
use crate::remote::RemoteLink;
use atomic_float::AtomicF64;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI32, Ordering};

/// Plugin state mirrored on the host. All fields are either immutable after
/// construction or atomics, so the relay can read it while the control
/// server and host code write to it.
pub struct BridgedPlugin {
    id: i32,
    name: String,
    filename: PathBuf,
    format: PluginFormat,
    parameters: Vec<ParameterData>,
    values: Vec<AtomicF64>,
    programs: Vec<String>,
    current_program: AtomicI32,
    midi_programs: Vec<MidiProgram>,
    current_midi_program: AtomicI32,
    post_events: PostEventBuffer,
    remote_ui: RemoteLink,
    peaks: PluginPeaks,
}

impl BridgedPlugin {
    pub fn builder(id: i32, name: impl Into<String>) -> BridgedPluginBuilder {
        BridgedPluginBuilder {
            id,
            name: name.into(),
            filename: PathBuf::new(),
            format: PluginFormat::Internal,
            parameters: Vec::new(),
            programs: Vec::new(),
            midi_programs: Vec::new(),
            post_event_capacity: MAX_POST_EVENTS,
        }
    }

    pub fn programs(&self) -> &[String] {
        &self.programs
    }

    /// Record a deferred event for the relay. Returns false if the buffer is full.
    pub fn post_event(&self, kind: PostEventKind, index: i32, value: f64) -> bool {
        self.post_events.post(kind, index, value)
    }

    /// Store a new parameter value and queue a change notification.
    pub fn change_parameter(&self, index: usize, value: f64) -> bool {
        let Some(data) = self.parameters.get(index) else {
            return false;
        };
        let value = data.clamp(value);
        self.values[index].store(value, Ordering::Release);
        self.post_event(PostEventKind::ParameterChange, index as i32, value)
    }

    pub fn change_program(&self, index: i32) -> bool {
        if index < 0 || index as usize >= self.programs.len() {
            return false;
        }
        self.current_program.store(index, Ordering::Release);
        self.post_event(PostEventKind::ProgramChange, index, 0.0)
    }

    pub fn change_midi_program(&self, index: i32) -> bool {
        if index < 0 || index as usize >= self.midi_programs.len() {
            return false;
        }
        self.current_midi_program.store(index, Ordering::Release);
        self.post_event(PostEventKind::MidiProgramChange, index, 0.0)
    }

    /// Index of the MIDI program matching `bank`/`program`.
    pub fn find_midi_program(&self, bank: u32, program: u32) -> Option<usize> {
        self.midi_programs
            .iter()
            .position(|mp| mp.bank == bank && mp.program == program)
    }
}

impl PluginInstance for BridgedPlugin {
    fn id(&self) -> i32 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn filename(&self) -> &Path {
        &self.filename
    }

    fn format(&self) -> PluginFormat {
        self.format
    }

    fn post_events(&self) -> &PostEventBuffer {
        &self.post_events
    }

    fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    fn parameter_data(&self, index: usize) -> Option<&ParameterData> {
        self.parameters.get(index)
    }

    fn parameter_value(&self, index: usize) -> f64 {
        self.values
            .get(index)
            .map(|v| v.load(Ordering::Acquire))
            .unwrap_or(0.0)
    }

    fn set_parameter_value(&self, index: usize, value: f64) {
        if let (Some(data), Some(slot)) = (self.parameters.get(index), self.values.get(index)) {
            slot.store(data.clamp(value), Ordering::Release);
        }
    }

    fn program_count(&self) -> usize {
        self.programs.len()
    }

    fn current_program(&self) -> i32 {
        self.current_program.load(Ordering::Acquire)
    }

    fn set_current_program(&self, index: i32) {
        if index >= -1 && index < self.programs.len() as i32 {
            self.current_program.store(index, Ordering::Release);
        }
    }

    fn midi_program_count(&self) -> usize {
        self.midi_programs.len()
    }

    fn midi_program(&self, index: usize) -> Option<&MidiProgram> {
        self.midi_programs.get(index)
    }

    fn current_midi_program(&self) -> i32 {
        self.current_midi_program.load(Ordering::Acquire)
    }

    fn set_current_midi_program(&self, index: i32) {
        if index >= -1 && index < self.midi_programs.len() as i32 {
            self.current_midi_program.store(index, Ordering::Release);
        }
    }

    fn remote_ui(&self) -> &RemoteLink {
        &self.remote_ui
    }

    fn peaks(&self) -> &PluginPeaks {
        &self.peaks
    }
}

pub struct BridgedPluginBuilder {
    id: i32,
    name: String,
    filename: PathBuf,
    format: PluginFormat,
    parameters: Vec<ParameterData>,
    programs: Vec<String>,
    midi_programs: Vec<MidiProgram>,
    post_event_capacity: usize,
}

impl BridgedPluginBuilder {
    pub fn filename(mut self, filename: impl Into<PathBuf>) -> Self {
        self.filename = filename.into();
        self
    }

    pub fn format(mut self, format: PluginFormat) -> Self {
        self.format = format;
        self
    }

    pub fn parameter(mut self, data: ParameterData) -> Self {
        self.parameters.push(data);
        self
    }

    pub fn program(mut self, name: impl Into<String>) -> Self {
        self.programs.push(name.into());
        self
    }

    pub fn midi_program(mut self, bank: u32, program: u32, name: impl Into<String>) -> Self {
        self.midi_programs.push(MidiProgram {
            bank,
            program,
            name: name.into(),
        });
        self
    }

    pub fn post_event_capacity(mut self, capacity: usize) -> Self {
        self.post_event_capacity = capacity;
        self
    }

    /// Size runtime buffers from a bridge configuration.
    pub fn config(self, config: &BridgeConfig) -> Self {
        self.post_event_capacity(config.post_event_capacity)
    }

    pub fn build(self) -> BridgedPlugin {
        let values = self
            .parameters
            .iter()
            .map(|p| AtomicF64::new(p.default_value))
            .collect();
        let current_program = if self.programs.is_empty() { -1 } else { 0 };
        let current_midi_program = if self.midi_programs.is_empty() { -1 } else { 0 };

        BridgedPlugin {
            id: self.id,
            name: self.name,
            filename: self.filename,
            format: self.format,
            parameters: self.parameters,
            values,
            programs: self.programs,
            current_program: AtomicI32::new(current_program),
            midi_programs: self.midi_programs,
            current_midi_program: AtomicI32::new(current_midi_program),
            post_events: PostEventBuffer::new(self.post_event_capacity),
            remote_ui: RemoteLink::new(),
            peaks: PluginPeaks::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synth() -> BridgedPlugin {
        BridgedPlugin::builder(4, "Synth")
            .filename("/usr/lib/dssi/synth.so")
            .format(PluginFormat::Dssi)
            .parameter(ParameterData::input("cutoff").range(0.0, 1.0, 0.5))
            .parameter(ParameterData::output("level").automatable())
            .program("Init")
            .program("Bass")
            .midi_program(0, 0, "Init")
            .midi_program(1, 3, "Pad")
            .build()
    }

    #[test]
    fn test_builder_defaults() {
        let plugin = synth();
        assert_eq!(plugin.id(), 4);
        assert_eq!(plugin.filename(), Path::new("/usr/lib/dssi/synth.so"));
        assert_eq!(plugin.parameter_count(), 2);
        assert_eq!(plugin.parameter_value(0), 0.5);
        assert_eq!(plugin.current_program(), 0);
        assert_eq!(plugin.current_midi_program(), 0);
        assert_eq!(plugin.post_events().capacity(), MAX_POST_EVENTS);
    }

    #[test]
    fn test_config_sizes_post_event_buffer() {
        let config = BridgeConfig {
            post_event_capacity: 8,
            ..BridgeConfig::default()
        };
        let plugin = BridgedPlugin::builder(5, "Chorus").config(&config).build();
        assert_eq!(plugin.post_events().capacity(), 8);

        for index in 0..8 {
            assert!(plugin.post_event(PostEventKind::ParameterChange, index, 0.0));
        }
        assert!(!plugin.post_event(PostEventKind::ParameterChange, 8, 0.0));
    }

    #[test]
    fn test_change_parameter_clamps_and_posts() {
        let plugin = synth();
        assert!(plugin.change_parameter(0, 2.0));
        assert_eq!(plugin.parameter_value(0), 1.0);
        assert!(!plugin.change_parameter(9, 0.0));

        let events = plugin.post_events().snapshot_and_clear();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, PostEventKind::ParameterChange);
        assert_eq!(events[0].value, 1.0);
    }

    #[test]
    fn test_program_bounds() {
        let plugin = synth();
        assert!(plugin.change_program(1));
        assert_eq!(plugin.current_program(), 1);
        assert!(!plugin.change_program(2));
        assert!(!plugin.change_midi_program(-1));

        plugin.set_current_midi_program(5);
        assert_eq!(plugin.current_midi_program(), 0);
        plugin.set_current_midi_program(1);
        assert_eq!(plugin.current_midi_program(), 1);
    }

    #[test]
    fn test_find_midi_program() {
        let plugin = synth();
        assert_eq!(plugin.find_midi_program(1, 3), Some(1));
        assert_eq!(plugin.find_midi_program(1, 4), None);
    }

    #[test]
    fn test_out_of_range_parameter_value() {
        let plugin = synth();
        assert_eq!(plugin.parameter_value(42), 0.0);
        plugin.set_parameter_value(42, 1.0);
    }
}
