//! Standard MIDI File export for an expanded score.
//!
//! Produces a Format 1 file: track 0 carries the tempo and time-signature
//! map from the playback walk, followed by one track per part.

use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
};
use num_rational::Rational64;
use thiserror::Error;

use crate::model::{Part, Score};
use crate::timeline::{playback_tempo_map, DEFAULT_BPM};

#[derive(Debug, Error)]
pub enum MidiError {
    #[error("failed to encode midi file: {0}")]
    Encode(String),
}

/// Render the expanded score as SMF bytes.
///
/// `tpq` is the tick resolution per quarter note (480 is customary; 0 falls
/// back to 480).
pub fn score_to_smf(expanded: &Score, tpq: u16) -> Result<Vec<u8>, MidiError> {
    let tpq = if tpq == 0 { 480 } else { tpq };

    let mut tracks = Vec::new();
    tracks.push(conductor_track(expanded, tpq));
    for part in &expanded.parts {
        tracks.push(part_track(part, tpq));
    }

    let smf = Smf {
        header: Header {
            format: Format::Parallel,
            timing: Timing::Metrical(tpq.into()),
        },
        tracks,
    };

    let mut out = Vec::new();
    smf.write(&mut out)
        .map_err(|e| MidiError::Encode(e.to_string()))?;
    Ok(out)
}

fn conductor_track<'a>(score: &Score, tpq: u16) -> Track<'a> {
    let mut events: Vec<TrackEvent> = Vec::new();

    let default_bpm = score.tempo_bpm.unwrap_or(DEFAULT_BPM);
    for &(at, bpm) in playback_tempo_map(score, default_bpm).points() {
        let microseconds_per_quarter = (60_000_000.0 / bpm) as u32;
        events.push(TrackEvent {
            delta: quarter_to_tick(at, tpq).into(),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(microseconds_per_quarter.into())),
        });
    }

    // Time signature changes, taken from the first part's measure walk.
    if let Some(part) = score.parts.first() {
        let mut cursor = Rational64::from_integer(0);
        let mut current = None;
        for measure in &part.measures {
            if current != Some(measure.time_signature) {
                current = Some(measure.time_signature);
                let (num, den) = measure.time_signature;
                let denominator_power = (den as f32).log2() as u8;
                events.push(TrackEvent {
                    delta: quarter_to_tick(cursor, tpq).into(),
                    kind: TrackEventKind::Meta(MetaMessage::TimeSignature(
                        num,
                        denominator_power,
                        24, // MIDI clocks per metronome click
                        8,  // 32nd notes per quarter note
                    )),
                });
            }
            cursor += measure.quarter_len();
        }
    }

    events.sort_by_key(|e| e.delta.as_int());
    convert_to_delta_times(&mut events);

    events.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    events
}

fn part_track<'a>(part: &'a Part, tpq: u16) -> Track<'a> {
    let mut events: Vec<TrackEvent<'a>> = Vec::new();
    let channel = part.midi_channel.saturating_sub(1).min(15);

    events.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::TrackName(part.name.as_bytes())),
    });
    events.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Midi {
            channel: channel.into(),
            message: MidiMessage::ProgramChange {
                program: part.midi_program.saturating_sub(1).min(127).into(),
            },
        },
    });

    let mut cursor = Rational64::from_integer(0);
    for measure in &part.measures {
        for note in &measure.notes {
            let Some(pitch) = note.pitch else { continue };
            let start = quarter_to_tick(cursor + note.start_time, tpq);
            let end = quarter_to_tick(cursor + note.start_time + note.duration, tpq);
            let key = pitch.midi_key();

            events.push(TrackEvent {
                delta: start.into(),
                kind: TrackEventKind::Midi {
                    channel: channel.into(),
                    message: MidiMessage::NoteOn { key: key.into(), vel: 64.into() },
                },
            });
            events.push(TrackEvent {
                delta: end.into(),
                kind: TrackEventKind::Midi {
                    channel: channel.into(),
                    message: MidiMessage::NoteOff { key: key.into(), vel: 0.into() },
                },
            });
        }
        cursor += measure.quarter_len();
    }

    // Stable sort keeps a NoteOff ahead of a NoteOn sharing its tick.
    events.sort_by_key(|e| e.delta.as_int());
    convert_to_delta_times(&mut events);

    events.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    events
}

/// Scale a quarter-note time to ticks, rounding to nearest.
fn quarter_to_tick(quarters: Rational64, tpq: u16) -> u32 {
    let scaled = quarters * Rational64::from_integer(tpq as i64);
    let num = *scaled.numer();
    let den = *scaled.denom();
    ((num + den / 2) / den).max(0) as u32
}

/// Convert absolute tick times to delta times (time since previous event).
fn convert_to_delta_times(events: &mut [TrackEvent]) {
    let mut prev_tick = 0u32;
    for event in events.iter_mut() {
        let current_tick = event.delta.as_int();
        event.delta = current_tick.saturating_sub(prev_tick).into();
        prev_tick = current_tick;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Measure, Note, Pitch};

    fn test_score(parts: usize) -> Score {
        let mut score = Score::new("Test".to_string(), "Nobody".to_string());
        for i in 0..parts {
            let mut measure = Measure::new(1, (4, 4), 0);
            measure.notes.push(Note {
                pitch: Some(Pitch { step: 'C', alter: 0, octave: 4 }),
                duration: Rational64::from_integer(4),
                voice: 1,
                staff: 1,
                start_time: Rational64::from_integer(0),
                is_rest: false,
                is_chord: false,
                tie: None,
            });
            score.parts.push(Part {
                id: format!("P{}", i + 1),
                name: format!("Part {}", i + 1),
                instrument: "Piano".to_string(),
                staves: 1,
                midi_channel: (i + 1) as u8,
                midi_program: 1,
                measures: vec![measure],
            });
        }
        score
    }

    #[test]
    fn writes_format_one_header() {
        let out = score_to_smf(&test_score(1), 480).expect("smf write failed");
        assert_eq!(&out[0..4], b"MThd");
        // Format 1
        assert_eq!(out[8], 0x00);
        assert_eq!(out[9], 0x01);
        // Conductor track + one part track
        assert_eq!(out[10], 0x00);
        assert_eq!(out[11], 0x02);
    }

    #[test]
    fn one_track_per_part_plus_conductor() {
        let out = score_to_smf(&test_score(2), 480).expect("smf write failed");
        assert_eq!(out[11], 0x03);
    }

    #[test]
    fn zero_tpq_falls_back() {
        let out = score_to_smf(&test_score(1), 0).expect("smf write failed");
        assert_eq!(&out[0..4], b"MThd");
    }

    #[test]
    fn tick_scaling_rounds_to_nearest() {
        assert_eq!(quarter_to_tick(Rational64::from_integer(1), 480), 480);
        assert_eq!(quarter_to_tick(Rational64::new(1, 3), 480), 160);
        assert_eq!(quarter_to_tick(Rational64::new(1, 7), 480), 69); // 68.57 rounds up
    }

    #[test]
    fn delta_time_conversion() {
        let mut events = vec![
            TrackEvent {
                delta: 0.into(),
                kind: TrackEventKind::Meta(MetaMessage::TrackName(b"Test")),
            },
            TrackEvent {
                delta: 100.into(),
                kind: TrackEventKind::Midi {
                    channel: 0.into(),
                    message: MidiMessage::NoteOn { key: 60.into(), vel: 64.into() },
                },
            },
            TrackEvent {
                delta: 200.into(),
                kind: TrackEventKind::Midi {
                    channel: 0.into(),
                    message: MidiMessage::NoteOff { key: 60.into(), vel: 0.into() },
                },
            },
        ];

        convert_to_delta_times(&mut events);

        assert_eq!(events[0].delta.as_int(), 0);
        assert_eq!(events[1].delta.as_int(), 100);
        assert_eq!(events[2].delta.as_int(), 100);
    }
}
