//! In-memory model of a music session.
//!
//! Reads may happen from any thread. Mutations are expected to arrive on the
//! host thread through the affinity dispatcher; the lock only guards against
//! torn reads while a mutation is in progress.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::routes::CommandError;

const CLIP_SLOT_COUNT: usize = 8;
const MIN_TEMPO: f64 = 20.0;
const MAX_TEMPO: f64 = 999.0;
const MAX_MIDI_VALUE: u8 = 127;

/// A MIDI note inside a clip. Missing fields take the usual defaults.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Note {
    /// MIDI pitch, 0 to 127.
    #[serde(default = "default_pitch")]
    pub pitch: u8,
    /// Offset from the clip start, in beats.
    #[serde(default)]
    pub start_time: f64,
    /// Length in beats.
    #[serde(default = "default_duration")]
    pub duration: f64,
    /// MIDI velocity, 0 to 127.
    #[serde(default = "default_velocity")]
    pub velocity: u8,
    /// Muted notes are kept but not played.
    #[serde(default)]
    pub mute: bool,
}

const fn default_pitch() -> u8 {
    60
}

const fn default_duration() -> f64 {
    0.25
}

const fn default_velocity() -> u8 {
    100
}

#[derive(Debug)]
struct Clip {
    name: String,
    length: f64,
    notes: Vec<Note>,
    playing: bool,
}

#[derive(Debug)]
struct Track {
    name: String,
    mute: bool,
    solo: bool,
    arm: bool,
    slots: Vec<Option<Clip>>,
}

impl Track {
    fn new(name: String) -> Self {
        Self {
            name,
            mute: false,
            solo: false,
            arm: false,
            slots: (0..CLIP_SLOT_COUNT).map(|_| None).collect(),
        }
    }
}

#[derive(Debug)]
struct SessionState {
    tempo: f64,
    signature_numerator: u32,
    signature_denominator: u32,
    playing: bool,
    song_time: f64,
    tracks: Vec<Track>,
}

impl SessionState {
    fn track(&self, track_index: i64) -> Result<&Track, CommandError> {
        usize::try_from(track_index)
            .ok()
            .and_then(|index| self.tracks.get(index))
            .ok_or_else(|| CommandError::invalid_params("Track index out of range"))
    }

    fn track_mut(&mut self, track_index: i64) -> Result<&mut Track, CommandError> {
        usize::try_from(track_index)
            .ok()
            .and_then(|index| self.tracks.get_mut(index))
            .ok_or_else(|| CommandError::invalid_params("Track index out of range"))
    }

    fn slot_mut(
        &mut self,
        track_index: i64,
        clip_index: i64,
    ) -> Result<&mut Option<Clip>, CommandError> {
        let track = self.track_mut(track_index)?;
        usize::try_from(clip_index)
            .ok()
            .and_then(|index| track.slots.get_mut(index))
            .ok_or_else(|| CommandError::invalid_params("Clip index out of range"))
    }

    fn clip_mut(&mut self, track_index: i64, clip_index: i64) -> Result<&mut Clip, CommandError> {
        self.slot_mut(track_index, clip_index)?
            .as_mut()
            .ok_or_else(|| CommandError::failed("No clip in slot"))
    }
}

/// Shared session state.
#[derive(Debug)]
pub struct Session {
    state: RwLock<SessionState>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Creates an empty session at 120 BPM in 4/4.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(SessionState {
                tempo: 120.0,
                signature_numerator: 4,
                signature_denominator: 4,
                playing: false,
                song_time: 0.0,
                tracks: Vec::new(),
            }),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, SessionState>, CommandError> {
        self.state
            .read()
            .map_err(|_| CommandError::failed("session state is unavailable"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, SessionState>, CommandError> {
        self.state
            .write()
            .map_err(|_| CommandError::failed("session state is unavailable"))
    }

    /// Summary of global session properties.
    pub fn info(&self) -> Result<Value, CommandError> {
        let state = self.read()?;
        Ok(json!({
            "tempo": state.tempo,
            "signature_numerator": state.signature_numerator,
            "signature_denominator": state.signature_denominator,
            "track_count": state.tracks.len(),
            "is_playing": state.playing,
            "current_song_time": state.song_time,
        }))
    }

    /// Detailed view of one track and its clip slots.
    pub fn track_info(&self, track_index: i64) -> Result<Value, CommandError> {
        let state = self.read()?;
        let track = state.track(track_index)?;
        let clip_slots: Vec<Value> = track
            .slots
            .iter()
            .enumerate()
            .map(|(index, slot)| {
                let clip = slot.as_ref().map(|clip| {
                    json!({
                        "name": clip.name,
                        "length": clip.length,
                        "is_playing": clip.playing,
                        "note_count": clip.notes.len(),
                    })
                });
                json!({"index": index, "has_clip": clip.is_some(), "clip": clip})
            })
            .collect();
        Ok(json!({
            "index": track_index,
            "name": track.name,
            "is_midi_track": true,
            "mute": track.mute,
            "solo": track.solo,
            "arm": track.arm,
            "clip_slots": clip_slots,
        }))
    }

    /// Inserts a MIDI track at `index`, or appends it when `index` is `-1`.
    pub fn create_midi_track(&self, index: i64) -> Result<Value, CommandError> {
        let mut state = self.write()?;
        let position = if index == -1 {
            state.tracks.len()
        } else {
            usize::try_from(index)
                .ok()
                .filter(|position| *position <= state.tracks.len())
                .ok_or_else(|| CommandError::invalid_params("Track index out of range"))?
        };
        let name = format!("{}-MIDI", position.saturating_add(1));
        state.tracks.insert(position, Track::new(name.clone()));
        Ok(json!({"index": position, "name": name}))
    }

    /// Renames a track.
    pub fn set_track_name(&self, track_index: i64, name: String) -> Result<Value, CommandError> {
        let mut state = self.write()?;
        let track = state.track_mut(track_index)?;
        track.name = name;
        Ok(json!({"name": track.name}))
    }

    /// Creates an empty clip of `length` beats in an empty slot.
    pub fn create_clip(
        &self,
        track_index: i64,
        clip_index: i64,
        length: f64,
    ) -> Result<Value, CommandError> {
        if !(length > 0.0) {
            return Err(CommandError::invalid_params("clip length must be positive"));
        }
        let mut state = self.write()?;
        let slot = state.slot_mut(track_index, clip_index)?;
        if slot.is_some() {
            return Err(CommandError::failed("Clip slot already has a clip"));
        }
        let clip = slot.insert(Clip {
            name: String::new(),
            length,
            notes: Vec::new(),
            playing: false,
        });
        Ok(json!({"name": clip.name, "length": clip.length}))
    }

    /// Adds notes to an existing clip.
    pub fn add_notes(
        &self,
        track_index: i64,
        clip_index: i64,
        notes: Vec<Note>,
    ) -> Result<Value, CommandError> {
        if let Some(note) = notes
            .iter()
            .find(|note| note.pitch > MAX_MIDI_VALUE || note.velocity > MAX_MIDI_VALUE)
        {
            return Err(CommandError::invalid_params(format!(
                "note pitch {} or velocity {} exceeds {MAX_MIDI_VALUE}",
                note.pitch, note.velocity
            )));
        }
        let mut state = self.write()?;
        let clip = state.clip_mut(track_index, clip_index)?;
        let note_count = notes.len();
        clip.notes.extend(notes);
        Ok(json!({"note_count": note_count}))
    }

    /// Renames a clip.
    pub fn set_clip_name(
        &self,
        track_index: i64,
        clip_index: i64,
        name: String,
    ) -> Result<Value, CommandError> {
        let mut state = self.write()?;
        let clip = state.clip_mut(track_index, clip_index)?;
        clip.name = name;
        Ok(json!({"name": clip.name}))
    }

    /// Sets the tempo in BPM.
    pub fn set_tempo(&self, tempo: f64) -> Result<Value, CommandError> {
        if !(MIN_TEMPO..=MAX_TEMPO).contains(&tempo) {
            return Err(CommandError::invalid_params(format!(
                "tempo must be between {MIN_TEMPO} and {MAX_TEMPO} BPM"
            )));
        }
        let mut state = self.write()?;
        state.tempo = tempo;
        Ok(json!({"tempo": state.tempo}))
    }

    /// Launches a clip; other clips on the same track stop.
    pub fn fire_clip(&self, track_index: i64, clip_index: i64) -> Result<Value, CommandError> {
        let mut state = self.write()?;
        state.clip_mut(track_index, clip_index)?;
        let target = usize::try_from(clip_index).ok();
        let track = state.track_mut(track_index)?;
        for (index, clip) in track.slots.iter_mut().enumerate() {
            if let Some(clip) = clip.as_mut() {
                clip.playing = Some(index) == target;
            }
        }
        state.playing = true;
        Ok(json!({"fired": true}))
    }

    /// Stops the clip in a slot. Stopping an empty slot is not an error.
    pub fn stop_clip(&self, track_index: i64, clip_index: i64) -> Result<Value, CommandError> {
        let mut state = self.write()?;
        if let Some(clip) = state.slot_mut(track_index, clip_index)?.as_mut() {
            clip.playing = false;
        }
        Ok(json!({"stopped": true}))
    }

    /// Starts transport playback.
    pub fn start_playback(&self) -> Result<Value, CommandError> {
        let mut state = self.write()?;
        state.playing = true;
        Ok(json!({"playing": state.playing}))
    }

    /// Stops transport playback.
    pub fn stop_playback(&self) -> Result<Value, CommandError> {
        let mut state = self.write()?;
        state.playing = false;
        Ok(json!({"playing": state.playing}))
    }

    /// Current playhead position in beats.
    pub fn playback_position(&self) -> Result<Value, CommandError> {
        let state = self.read()?;
        Ok(json!({"current_song_time": state.song_time, "is_playing": state.playing}))
    }

    /// Moves the playhead to `time` beats, keeping the transport state.
    pub fn set_playback_position(&self, time: f64) -> Result<Value, CommandError> {
        if !time.is_finite() || time < 0.0 {
            return Err(CommandError::invalid_params(
                "time must be a non-negative number of beats",
            ));
        }
        let mut state = self.write()?;
        state.song_time = time;
        Ok(json!({"song_time_set": time, "was_playing": state.playing}))
    }
}
