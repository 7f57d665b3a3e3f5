//! Dual-timeline sequencing.
//!
//! Runs two independent quarter-note walks (a display walk over the notated
//! score, a playback walk over the expanded score), projects both through
//! piecewise tempo maps into milliseconds, and joins them per note identity.
//! The resulting event records are the downstream contract for cursor UIs
//! and playback engines.

use std::collections::{HashMap, HashSet};

use log::warn;
use num_rational::Rational64;
use num_traits::ToPrimitive;
use serde::Serialize;

use crate::model::{Score, Tie};

/// Tempo assumed when the document never states one.
pub const DEFAULT_BPM: f64 = 120.0;

/// Piecewise-constant tempo map over quarter-note time.
#[derive(Debug, Clone, PartialEq)]
pub struct TempoMap {
    points: Vec<(Rational64, f64)>,
}

impl TempoMap {
    pub fn new(initial_bpm: f64) -> Self {
        TempoMap { points: vec![(Rational64::from_integer(0), initial_bpm)] }
    }

    /// Record a tempo change at a quarter-note time at or after every
    /// previous one. A change at the same time replaces the previous value;
    /// a redundant change is dropped.
    pub fn push_change(&mut self, at: Rational64, bpm: f64) {
        if let Some(last) = self.points.last_mut() {
            if last.0 == at {
                last.1 = bpm;
                return;
            }
            if last.1 == bpm {
                return;
            }
        }
        self.points.push((at, bpm));
    }

    /// Milliseconds elapsed between quarter 0 and `t`: full segments before
    /// `t` contribute their length at their own tempo, plus the partial
    /// remainder of the segment containing `t`.
    pub fn ms_at(&self, t: Rational64) -> f64 {
        let mut ms = 0.0;
        for (i, &(start, bpm)) in self.points.iter().enumerate() {
            if start >= t {
                break;
            }
            let end = self.points.get(i + 1).map(|p| p.0.min(t)).unwrap_or(t);
            ms += rational_to_f64(end - start) * 60_000.0 / bpm;
        }
        ms
    }

    /// Breakpoints as (quarter_time, bpm), starting at quarter 0.
    pub fn points(&self) -> &[(Rational64, f64)] {
        &self.points
    }
}

fn rational_to_f64(r: Rational64) -> f64 {
    r.to_f64().unwrap_or(*r.numer() as f64 / *r.denom() as f64)
}

/// One note occurrence in playback order, with dual timing and repeat
/// provenance. This field set is the downstream compatibility contract.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteEvent {
    /// Pitch label like "C4" or "F#5"; absent for rests.
    pub pitch: Option<String>,
    pub is_rest: bool,
    pub is_chord: bool,
    pub tie: Option<Tie>,
    pub staff: u32,
    pub voice: u32,
    /// Original measure number of the occurrence.
    pub measure: u32,
    /// Playback-timeline start, strictly increasing across repeats.
    pub start_time_ms: f64,
    /// Display-timeline start, identical for every occurrence of the same
    /// notated measure.
    pub start_time_display_ms: f64,
    pub duration_ms: f64,
    /// 0-based iteration of the enclosing repeat section.
    pub iteration: u32,
    pub is_repeat: bool,
    pub repeat_id: Option<String>,
    /// "main", or "volta_N" under an ending bracket.
    pub repeat_section: String,
    pub total_iterations: u32,
}

/// Tempo breakpoint projected onto the playback timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TempoPoint {
    pub time_ms: f64,
    pub bpm: f64,
}

/// Derived play-level events in a small closed set; each variant carries
/// only the fields relevant to its kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlaybackEvent {
    NoteOn { time_ms: f64, pitch: String, staff: u32, voice: u32, measure: u32 },
    NoteOff { time_ms: f64, pitch: String, staff: u32, voice: u32, measure: u32 },
    TempoChange { time_ms: f64, bpm: f64 },
}

impl PlaybackEvent {
    pub fn time_ms(&self) -> f64 {
        match self {
            PlaybackEvent::NoteOn { time_ms, .. }
            | PlaybackEvent::NoteOff { time_ms, .. }
            | PlaybackEvent::TempoChange { time_ms, .. } => *time_ms,
        }
    }

    // Tie-break so simultaneous events settle as tempo, then off, then on.
    fn rank(&self) -> u8 {
        match self {
            PlaybackEvent::TempoChange { .. } => 0,
            PlaybackEvent::NoteOff { .. } => 1,
            PlaybackEvent::NoteOn { .. } => 2,
        }
    }
}

/// Events partitioned by staff: 1 = right hand, 2 = left hand, anything
/// else passes through for caller-defined policy.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HandSplit {
    pub right: Vec<NoteEvent>,
    pub left: Vec<NoteEvent>,
    pub other: Vec<NoteEvent>,
}

/// The sequenced output: ordered note events plus the playback tempo
/// timeline they were projected through.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timeline {
    pub events: Vec<NoteEvent>,
    pub tempo_changes: Vec<TempoPoint>,
    /// Join irregularities (display identities that could not be resolved).
    pub warnings: Vec<String>,
}

impl Timeline {
    pub fn split_hands(&self) -> HandSplit {
        let mut split = HandSplit::default();
        for event in &self.events {
            match event.staff {
                1 => split.right.push(event.clone()),
                2 => split.left.push(event.clone()),
                _ => split.other.push(event.clone()),
            }
        }
        split
    }

    /// Paired NoteOn/NoteOff events plus a TempoChange at every playback
    /// breakpoint. NoteOff sorts before NoteOn at equal timestamps so
    /// re-struck notes never overlap.
    pub fn playback_events(&self) -> Vec<PlaybackEvent> {
        let mut out: Vec<PlaybackEvent> = self
            .tempo_changes
            .iter()
            .map(|tc| PlaybackEvent::TempoChange { time_ms: tc.time_ms, bpm: tc.bpm })
            .collect();

        for event in &self.events {
            let Some(pitch) = event.pitch.clone() else { continue };
            out.push(PlaybackEvent::NoteOn {
                time_ms: event.start_time_ms,
                pitch: pitch.clone(),
                staff: event.staff,
                voice: event.voice,
                measure: event.measure,
            });
            out.push(PlaybackEvent::NoteOff {
                time_ms: event.start_time_ms + event.duration_ms,
                pitch,
                staff: event.staff,
                voice: event.voice,
                measure: event.measure,
            });
        }

        out.sort_by(|a, b| {
            a.time_ms()
                .total_cmp(&b.time_ms())
                .then_with(|| a.rank().cmp(&b.rank()))
        });
        out
    }

    /// Serialize the full timeline for downstream consumers.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Identity of a note occurrence within its notated measure.
type NoteKey = (usize, u32, u32, u32, usize);

/// Sequence the expanded score against the original.
///
/// The display walk covers the original score and yields one start time per
/// notated note; the playback walk covers the expanded score. Both feed
/// their own tempo map, and every expanded note is joined to its notated
/// identity (part, measure number, voice, staff, ordinal).
pub fn sequence(original: &Score, expanded: &Score) -> Timeline {
    let default_bpm = original.tempo_bpm.unwrap_or(DEFAULT_BPM);

    // Display walk.
    let mut display_starts: HashMap<NoteKey, Rational64> = HashMap::new();
    let mut display_breaks: Vec<(Rational64, f64)> = Vec::new();
    for (part_index, part) in original.parts.iter().enumerate() {
        let mut cursor = Rational64::from_integer(0);
        for measure in &part.measures {
            if let Some(bpm) = measure.tempo_bpm {
                display_breaks.push((cursor, bpm));
            }
            let mut ordinals: HashMap<(u32, u32), usize> = HashMap::new();
            for note in &measure.notes {
                let slot = ordinals.entry((note.voice, note.staff)).or_insert(0);
                let ordinal = *slot;
                *slot += 1;
                display_starts
                    .entry((part_index, measure.number, note.voice, note.staff, ordinal))
                    .or_insert(cursor + note.start_time);
            }
            cursor += measure.quarter_len();
        }
    }
    let display_map = tempo_map_from(default_bpm, display_breaks);

    // Playback walk, tempo first so every event converts through the
    // complete map.
    let playback_map = playback_tempo_map(expanded, default_bpm);

    let mut events = Vec::new();
    let mut warnings = Vec::new();
    let mut unresolved: HashSet<u32> = HashSet::new();
    for (part_index, part) in expanded.parts.iter().enumerate() {
        let mut cursor = Rational64::from_integer(0);
        for measure in &part.measures {
            let mut ordinals: HashMap<(u32, u32), usize> = HashMap::new();
            for note in &measure.notes {
                let slot = ordinals.entry((note.voice, note.staff)).or_insert(0);
                let ordinal = *slot;
                *slot += 1;

                let playback_start = cursor + note.start_time;
                let start_time_ms = playback_map.ms_at(playback_start);
                let duration_ms =
                    playback_map.ms_at(playback_start + note.duration) - start_time_ms;

                let key = (part_index, measure.number, note.voice, note.staff, ordinal);
                let start_time_display_ms = match display_starts.get(&key) {
                    Some(start) => display_map.ms_at(*start),
                    None => {
                        if unresolved.insert(measure.number) {
                            let message = format!(
                                "measure {}: no display identity for expanded note, using playback time",
                                measure.number
                            );
                            warn!("{}", message);
                            warnings.push(message);
                        }
                        start_time_ms
                    }
                };

                let (iteration, is_repeat, repeat_id, repeat_section, total_iterations) =
                    match &measure.repeat {
                        Some(tag) => (
                            tag.iteration,
                            true,
                            Some(tag.section_id.clone()),
                            tag.ending_label.clone(),
                            tag.total_iterations,
                        ),
                        None => (0, false, None, "main".to_string(), 1),
                    };

                events.push(NoteEvent {
                    pitch: note.pitch.map(|p| p.label()),
                    is_rest: note.is_rest,
                    is_chord: note.is_chord,
                    tie: note.tie,
                    staff: note.staff,
                    voice: note.voice,
                    measure: measure.number,
                    start_time_ms,
                    start_time_display_ms,
                    duration_ms,
                    iteration,
                    is_repeat,
                    repeat_id,
                    repeat_section,
                    total_iterations,
                });
            }
            cursor += measure.quarter_len();
        }
    }

    events.sort_by(|a, b| {
        a.start_time_ms
            .total_cmp(&b.start_time_ms)
            .then_with(|| a.staff.cmp(&b.staff))
            .then_with(|| a.voice.cmp(&b.voice))
    });

    let tempo_changes = playback_map
        .points()
        .iter()
        .map(|&(at, bpm)| TempoPoint { time_ms: playback_map.ms_at(at), bpm })
        .collect();

    Timeline { events, tempo_changes, warnings }
}

fn tempo_map_from(default_bpm: f64, mut breaks: Vec<(Rational64, f64)>) -> TempoMap {
    breaks.sort_by_key(|b| b.0);
    let mut map = TempoMap::new(default_bpm);
    for (at, bpm) in breaks {
        map.push_change(at, bpm);
    }
    map
}

/// Tempo map of a score's own measure order, merged across parts. The
/// sequencer uses it for the playback walk; the SMF export reuses it for
/// the conductor track.
pub(crate) fn playback_tempo_map(score: &Score, default_bpm: f64) -> TempoMap {
    let mut breaks: Vec<(Rational64, f64)> = Vec::new();
    for part in &score.parts {
        let mut cursor = Rational64::from_integer(0);
        for measure in &part.measures {
            if let Some(bpm) = measure.tempo_bpm {
                breaks.push((cursor, bpm));
            }
            cursor += measure.quarter_len();
        }
    }
    tempo_map_from(default_bpm, breaks)
}
