//! Score graph produced by the two parsing passes.
//!
//! All quarter-note times and durations are exact rationals; milliseconds
//! only appear once the timeline projection runs.

use num_rational::Rational64;
use serde::Serialize;

/// A complete parsed score: metadata, parts, and the diagnostics collected
/// while building it.
#[derive(Debug, Clone, PartialEq)]
pub struct Score {
    pub title: String,
    pub composer: String,
    /// Tempo of the first measure, in quarter-note BPM. `None` when the
    /// document never states one; consumers fall back to 120.
    pub tempo_bpm: Option<f64>,
    pub time_signature: (u8, u8),
    pub key_fifths: i8,
    pub parts: Vec<Part>,
    /// Recoverable content errors, in document order.
    pub errors: Vec<String>,
    /// Non-fatal irregularities (unmatched repeats, clamped counts, ...).
    pub warnings: Vec<String>,
}

impl Score {
    pub fn new(title: String, composer: String) -> Self {
        Score {
            title,
            composer,
            tempo_bpm: None,
            time_signature: (4, 4),
            key_fifths: 0,
            parts: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// One instrument part. Measure order is the sole carrier of program order.
#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    pub id: String,
    pub name: String,
    pub instrument: String,
    pub staves: u32,
    pub midi_channel: u8,
    pub midi_program: u8,
    pub measures: Vec<Measure>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Measure {
    /// 1-based sequence number. Strictly increasing in the original score;
    /// repeats in the expanded score after cloning.
    pub number: u32,
    /// Effective time signature, with inheritance already resolved.
    pub time_signature: (u8, u8),
    /// Effective key signature in fifths, with inheritance already resolved.
    pub key_fifths: i8,
    /// Quarter-note BPM, set only where this measure introduces a change.
    pub tempo_bpm: Option<f64>,
    pub notes: Vec<Note>,
    pub repeat_start: bool,
    pub repeat_end: bool,
    /// Declared iteration count of a backward repeat. Kept verbatim (may be
    /// zero or negative in a malformed document); the expander clamps it.
    pub repeat_count: i32,
    /// Ending ordinals this measure belongs to, sorted and deduplicated.
    /// Empty when the measure is not part of a volta bracket.
    pub volta_numbers: Vec<u32>,
    pub volta_type: VoltaType,
    /// Expansion provenance. Always `None` in the original score.
    pub repeat: Option<RepeatTag>,
}

impl Measure {
    pub fn new(number: u32, time_signature: (u8, u8), key_fifths: i8) -> Self {
        Measure {
            number,
            time_signature,
            key_fifths,
            tempo_bpm: None,
            notes: Vec::new(),
            repeat_start: false,
            repeat_end: false,
            repeat_count: 2,
            volta_numbers: Vec::new(),
            volta_type: VoltaType::None,
            repeat: None,
        }
    }

    /// Nominal measure length in quarter notes: beats * 4 / beat_type.
    pub fn quarter_len(&self) -> Rational64 {
        let (beats, beat_type) = self.time_signature;
        Rational64::new(beats as i64 * 4, (beat_type as i64).max(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoltaType {
    #[default]
    None,
    Start,
    Stop,
    Discontinue,
}

/// Provenance of a cloned measure in the expanded score.
#[derive(Debug, Clone, PartialEq)]
pub struct RepeatTag {
    /// 0-based iteration of the enclosing repeat section.
    pub iteration: u32,
    /// Stable identifier derived from the part and the section's measure range.
    pub section_id: String,
    /// "main", or "volta_N" for measures played under an ending bracket.
    pub ending_label: String,
    pub total_iterations: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    /// `None` for rests, never a sentinel value.
    pub pitch: Option<Pitch>,
    /// Duration in quarter-note units.
    pub duration: Rational64,
    pub voice: u32,
    pub staff: u32,
    /// Offset from the start of the owning measure.
    pub start_time: Rational64,
    pub is_rest: bool,
    /// True when this note sounds together with the preceding non-chord note
    /// of the same voice.
    pub is_chord: bool,
    pub tie: Option<Tie>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tie {
    Start,
    Stop,
    Continue,
}

/// Spelled pitch: step letter, alteration in semitones, octave (C4 = middle C).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pitch {
    pub step: char,
    pub alter: i8,
    pub octave: i8,
}

impl Pitch {
    /// Render as a label like "C4", "F#5", or "Bbb3".
    pub fn label(&self) -> String {
        let accidental = match self.alter {
            -2 => "bb",
            -1 => "b",
            1 => "#",
            2 => "##",
            _ => "",
        };
        format!("{}{}{}", self.step, accidental, self.octave)
    }

    /// MIDI key number, clamped to 0..=127 (C4 = 60).
    pub fn midi_key(&self) -> u8 {
        let base = match self.step {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            _ => 0,
        };
        let semi = base as i16 + self.alter as i16 + (self.octave as i16 + 1) * 12;
        semi.clamp(0, 127) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pitch_labels() {
        let p = |step, alter, octave| Pitch { step, alter, octave };
        assert_eq!(p('C', 0, 4).label(), "C4");
        assert_eq!(p('F', 1, 5).label(), "F#5");
        assert_eq!(p('B', -1, 3).label(), "Bb3");
        assert_eq!(p('E', -2, 2).label(), "Ebb2");
        assert_eq!(p('G', 2, 6).label(), "G##6");
    }

    #[test]
    fn pitch_midi_keys() {
        assert_eq!(Pitch { step: 'C', alter: 0, octave: 4 }.midi_key(), 60);
        assert_eq!(Pitch { step: 'A', alter: 0, octave: 4 }.midi_key(), 69);
        assert_eq!(Pitch { step: 'C', alter: 1, octave: 4 }.midi_key(), 61);
        assert_eq!(Pitch { step: 'D', alter: -1, octave: 4 }.midi_key(), 61);
        // clamped at the range edges
        assert_eq!(Pitch { step: 'C', alter: 0, octave: -2 }.midi_key(), 0);
        assert_eq!(Pitch { step: 'G', alter: 0, octave: 9 }.midi_key(), 127);
    }

    #[test]
    fn measure_quarter_len() {
        assert_eq!(Measure::new(1, (4, 4), 0).quarter_len(), Rational64::from_integer(4));
        assert_eq!(Measure::new(1, (3, 4), 0).quarter_len(), Rational64::from_integer(3));
        assert_eq!(Measure::new(1, (2, 2), 0).quarter_len(), Rational64::from_integer(4));
        assert_eq!(Measure::new(1, (6, 8), 0).quarter_len(), Rational64::new(3, 1));
    }
}
