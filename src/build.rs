//! Second pass: content builder.
//!
//! Consumes the structure descriptor plus the document and produces the
//! original score graph: measures, notes with exact rational durations,
//! repeat/ending markers, and tempo overrides. Attribute inheritance
//! (divisions, time signature, key) flows through an explicit immutable
//! [`BuildContext`] snapshot passed into and returned from each
//! measure-build step.

use std::collections::HashMap;

use num_rational::Rational64;
use roxmltree::{Document, Node};

use crate::diagnostics::Diagnostics;
use crate::model::{Measure, Note, Part, Pitch, Score, Tie, VoltaType};
use crate::scan::ScoreStructure;
use crate::xml::{child, child_text};

/// Attribute context in force at a given measure.
///
/// A change found in a measure yields a new snapshot that applies to that
/// measure and everything after it until overridden again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildContext {
    /// Ticks per quarter note.
    pub divisions: u32,
    pub time_signature: (u8, u8),
    pub key_fifths: i8,
}

impl BuildContext {
    fn initial(structure: &ScoreStructure) -> Self {
        BuildContext {
            divisions: structure.divisions,
            time_signature: (4, 4),
            key_fifths: 0,
        }
    }
}

/// Build the original score from the document and the pass-1 descriptor.
pub fn build_score(doc: &Document, structure: &ScoreStructure, diag: &mut Diagnostics) -> Score {
    let root = doc.root_element();
    let mut score = Score::new(structure.title.clone(), structure.composer.clone());

    for info in &structure.parts {
        score.parts.push(Part {
            id: info.id.clone(),
            name: info.name.clone(),
            instrument: info.instrument.clone(),
            staves: info.staves,
            midi_channel: info.midi_channel,
            midi_program: info.midi_program,
            measures: Vec::new(),
        });
    }

    for part_node in root.children().filter(|n| n.has_tag_name("part")) {
        let Some(id) = part_node.attribute("id") else {
            diag.error("part missing id attribute");
            continue;
        };
        let Some(index) = score.parts.iter().position(|p| p.id == id) else {
            diag.error(format!("part {} not declared in part-list", id));
            continue;
        };

        let mut ctx = BuildContext::initial(structure);
        let mut measures = Vec::new();
        for measure_node in part_node.children().filter(|n| n.has_tag_name("measure")) {
            if let Some(staves) = declared_staves(measure_node) {
                score.parts[index].staves = staves;
            }
            let fallback = measures.last().map(|m: &Measure| m.number + 1).unwrap_or(1);
            let (measure, next) = build_measure(measure_node, ctx, fallback, diag);
            ctx = next;
            measures.push(measure);
        }
        score.parts[index].measures = measures;
    }

    // Score-level defaults come from the first measure of the first part.
    if let Some(first) = score.parts.first().and_then(|p| p.measures.first()) {
        score.tempo_bpm = first.tempo_bpm;
        score.time_signature = first.time_signature;
        score.key_fifths = first.key_fifths;
    }

    score
}

fn declared_staves(measure_node: Node) -> Option<u32> {
    let attrs = child(measure_node, "attributes")?;
    child_text(attrs, "staves")?.trim().parse().ok().filter(|n| *n > 0)
}

/// Build one measure, returning it together with the context in force after
/// its attribute changes.
fn build_measure(
    node: Node,
    ctx: BuildContext,
    fallback_number: u32,
    diag: &mut Diagnostics,
) -> (Measure, BuildContext) {
    let number = match node.attribute("number").map(str::parse::<u32>) {
        Some(Ok(n)) => n,
        Some(Err(_)) => {
            diag.error(format!(
                "invalid measure number '{}', using {}",
                node.attribute("number").unwrap_or(""),
                fallback_number
            ));
            fallback_number
        }
        None => {
            diag.error(format!("measure missing number attribute, using {}", fallback_number));
            fallback_number
        }
    };

    let mut next = ctx;
    for attrs in node.children().filter(|n| n.has_tag_name("attributes")) {
        next = apply_attributes(attrs, next, number, diag);
    }

    let mut measure = Measure::new(number, next.time_signature, next.key_fifths);
    measure.tempo_bpm = measure_tempo(node, number, diag);
    collect_barlines(node, &mut measure, diag);
    measure.notes = build_notes(node, next, number, diag);

    (measure, next)
}

fn apply_attributes(
    attrs: Node,
    ctx: BuildContext,
    measure_number: u32,
    diag: &mut Diagnostics,
) -> BuildContext {
    let mut next = ctx;

    if let Some(text) = child_text(attrs, "divisions") {
        match text.trim().parse::<u32>() {
            Ok(n) if n > 0 => next.divisions = n,
            _ => diag.error(format!("measure {}: invalid divisions '{}'", measure_number, text)),
        }
    }

    if let Some(time) = child(attrs, "time") {
        let beats = child_text(time, "beats").and_then(|t| t.trim().parse::<u8>().ok());
        let beat_type = child_text(time, "beat-type").and_then(|t| t.trim().parse::<u8>().ok());
        match (beats, beat_type) {
            (Some(b), Some(t)) if b > 0 && t > 0 => next.time_signature = (b, t),
            _ => diag.error(format!("measure {}: invalid time signature", measure_number)),
        }
    }

    if let Some(key) = child(attrs, "key") {
        if let Some(text) = child_text(key, "fifths") {
            match text.trim().parse::<i8>() {
                Ok(f) if (-7..=7).contains(&f) => next.key_fifths = f,
                _ => diag.error(format!("measure {}: invalid key fifths '{}'", measure_number, text)),
            }
        }
    }

    next
}

/// Quarter-note BPM introduced by this measure's directions, if any.
///
/// A metronome marking is scaled by its beat unit (half note at 60 yields
/// 120 quarter-BPM); a sound element's tempo attribute is already in
/// quarter-BPM. The last observation in document order wins.
fn measure_tempo(node: Node, measure_number: u32, diag: &mut Diagnostics) -> Option<f64> {
    let mut tempo = None;

    for direction in node.children().filter(|n| n.has_tag_name("direction")) {
        if let Some(metronome) = direction
            .descendants()
            .find(|n| n.has_tag_name("metronome"))
        {
            if let Some(text) = child_text(metronome, "per-minute") {
                match text.trim().parse::<f64>() {
                    Ok(per_minute) if per_minute > 0.0 => {
                        let unit = child_text(metronome, "beat-unit").map(str::trim);
                        let mut quarters = beat_unit_quarters(unit, measure_number, diag);
                        for _ in metronome.children().filter(|n| n.has_tag_name("beat-unit-dot")) {
                            quarters *= 1.5;
                        }
                        tempo = Some(per_minute * quarters);
                    }
                    _ => diag.error(format!(
                        "measure {}: invalid per-minute value '{}'",
                        measure_number, text
                    )),
                }
            }
        }
        if let Some(sound) = child(direction, "sound") {
            if let Some(bpm) = sound_tempo(sound, measure_number, diag) {
                tempo = Some(bpm);
            }
        }
    }
    for sound in node.children().filter(|n| n.has_tag_name("sound")) {
        if let Some(bpm) = sound_tempo(sound, measure_number, diag) {
            tempo = Some(bpm);
        }
    }

    tempo
}

fn sound_tempo(sound: Node, measure_number: u32, diag: &mut Diagnostics) -> Option<f64> {
    let text = sound.attribute("tempo")?;
    match text.trim().parse::<f64>() {
        Ok(bpm) if bpm > 0.0 => Some(bpm),
        _ => {
            diag.error(format!("measure {}: invalid sound tempo '{}'", measure_number, text));
            None
        }
    }
}

fn beat_unit_quarters(unit: Option<&str>, measure_number: u32, diag: &mut Diagnostics) -> f64 {
    match unit {
        None | Some("quarter") => 1.0,
        Some("whole") => 4.0,
        Some("half") => 2.0,
        Some("eighth") => 0.5,
        Some("16th") => 0.25,
        Some("32nd") => 0.125,
        Some(other) => {
            diag.warning(format!(
                "measure {}: unknown beat-unit '{}', assuming quarter",
                measure_number, other
            ));
            1.0
        }
    }
}

/// Gather repeat and ending markers from every barline of the measure.
///
/// All ending observations are collected first; the volta type then resolves
/// by priority Stop > Start > Discontinue, no matter which barline edge
/// carried which observation.
fn collect_barlines(node: Node, measure: &mut Measure, diag: &mut Diagnostics) {
    let mut numbers: Vec<u32> = Vec::new();
    let mut types: Vec<VoltaType> = Vec::new();

    for barline in node.children().filter(|n| n.has_tag_name("barline")) {
        if let Some(repeat) = child(barline, "repeat") {
            match repeat.attribute("direction") {
                Some("forward") => measure.repeat_start = true,
                Some("backward") => {
                    measure.repeat_end = true;
                    if let Some(times) = repeat.attribute("times") {
                        match times.trim().parse::<i32>() {
                            Ok(n) => measure.repeat_count = n,
                            Err(_) => diag.error(format!(
                                "measure {}: invalid repeat times '{}'",
                                measure.number, times
                            )),
                        }
                    }
                }
                Some(other) => diag.warning(format!(
                    "measure {}: unknown repeat direction '{}'",
                    measure.number, other
                )),
                None => {}
            }
        }

        for ending in barline.children().filter(|n| n.has_tag_name("ending")) {
            if let Some(list) = ending.attribute("number") {
                for piece in list.split(',') {
                    let piece = piece.trim();
                    if piece.is_empty() {
                        continue;
                    }
                    match piece.parse::<u32>() {
                        Ok(n) if n > 0 => numbers.push(n),
                        _ => diag.warning(format!(
                            "measure {}: invalid ending number '{}'",
                            measure.number, piece
                        )),
                    }
                }
            }
            match ending.attribute("type") {
                Some("start") => types.push(VoltaType::Start),
                Some("stop") => types.push(VoltaType::Stop),
                Some("discontinue") => types.push(VoltaType::Discontinue),
                Some(other) => diag.warning(format!(
                    "measure {}: invalid ending type '{}'",
                    measure.number, other
                )),
                None => {}
            }
        }
    }

    numbers.sort_unstable();
    numbers.dedup();

    let resolved = if types.contains(&VoltaType::Stop) {
        VoltaType::Stop
    } else if types.contains(&VoltaType::Start) {
        VoltaType::Start
    } else if types.contains(&VoltaType::Discontinue) {
        VoltaType::Discontinue
    } else {
        VoltaType::None
    };

    // volta_numbers must be non-empty exactly when a volta type is present.
    match (numbers.is_empty(), resolved) {
        (false, VoltaType::None) => {
            diag.warning(format!(
                "measure {}: ending numbers without an ending type, dropping",
                measure.number
            ));
        }
        (true, t) if t != VoltaType::None => {
            diag.warning(format!(
                "measure {}: ending type without numbers, dropping",
                measure.number
            ));
        }
        (false, t) => {
            measure.volta_numbers = numbers;
            measure.volta_type = t;
        }
        _ => {}
    }
}

fn build_notes(
    node: Node,
    ctx: BuildContext,
    measure_number: u32,
    diag: &mut Diagnostics,
) -> Vec<Note> {
    let mut notes = Vec::new();
    // Per-voice time cursors, relative to the measure start.
    let mut cursors: HashMap<u32, Rational64> = HashMap::new();
    // Start of the last non-chord note seen in each voice.
    let mut chord_anchors: HashMap<u32, Rational64> = HashMap::new();

    for note_node in node.children().filter(|n| n.has_tag_name("note")) {
        let declared_rest = child(note_node, "rest").is_some();
        let is_chord = child(note_node, "chord").is_some();
        let voice = parse_count(note_node, "voice", 1, measure_number, diag);
        let staff = parse_count(note_node, "staff", 1, measure_number, diag);

        let duration = match child_text(note_node, "duration") {
            Some(text) => match text.trim().parse::<i64>() {
                Ok(ticks) if ticks >= 0 => Rational64::new(ticks, ctx.divisions as i64),
                _ => {
                    diag.error(format!(
                        "measure {}: invalid duration '{}', using 0",
                        measure_number, text
                    ));
                    Rational64::from_integer(0)
                }
            },
            None => {
                diag.error(format!("measure {}: note missing duration, using 0", measure_number));
                Rational64::from_integer(0)
            }
        };

        let pitch = if declared_rest {
            None
        } else {
            parse_pitch(note_node, measure_number, diag)
        };
        let is_rest = pitch.is_none();

        let start_time = {
            let cursor = cursors.entry(voice).or_insert_with(|| Rational64::from_integer(0));
            if is_chord {
                chord_anchors.get(&voice).copied().unwrap_or(*cursor)
            } else {
                let start = *cursor;
                *cursor += duration;
                chord_anchors.insert(voice, start);
                start
            }
        };

        notes.push(Note {
            pitch,
            duration,
            voice,
            staff,
            start_time,
            is_rest,
            is_chord,
            tie: parse_tie(note_node),
        });
    }

    notes
}

fn parse_count(
    note_node: Node,
    name: &str,
    default: u32,
    measure_number: u32,
    diag: &mut Diagnostics,
) -> u32 {
    match child_text(note_node, name) {
        Some(text) => match text.trim().parse::<u32>() {
            Ok(n) if n > 0 => n,
            _ => {
                diag.warning(format!(
                    "measure {}: invalid {} '{}', using {}",
                    measure_number, name, text, default
                ));
                default
            }
        },
        None => default,
    }
}

/// Parse the pitch of a non-rest note. Any malformation is a recorded
/// content error; an unusable pitch turns the note into a rest.
fn parse_pitch(note_node: Node, measure_number: u32, diag: &mut Diagnostics) -> Option<Pitch> {
    let Some(pitch_node) = child(note_node, "pitch") else {
        diag.error(format!(
            "measure {}: note has neither pitch nor rest, treating as rest",
            measure_number
        ));
        return None;
    };

    let step = match child_text(pitch_node, "step").map(str::trim) {
        Some(s) if s.len() == 1 && matches!(s.as_bytes()[0], b'A'..=b'G') => s.as_bytes()[0] as char,
        other => {
            diag.error(format!(
                "measure {}: invalid pitch step '{}', treating as rest",
                measure_number,
                other.unwrap_or("")
            ));
            return None;
        }
    };

    let octave = match child_text(pitch_node, "octave").map(|t| t.trim().parse::<i8>()) {
        Some(Ok(o)) => o,
        _ => {
            diag.error(format!(
                "measure {}: missing or invalid octave, treating as rest",
                measure_number
            ));
            return None;
        }
    };

    let alter = match child_text(pitch_node, "alter") {
        None => 0,
        Some(text) => match text.trim().parse::<f64>() {
            Ok(v) if v.fract() == 0.0 && (-2.0..=2.0).contains(&v) => v as i8,
            Ok(v) => {
                diag.error(format!(
                    "measure {}: unsupported alteration {}, using natural",
                    measure_number, v
                ));
                0
            }
            Err(_) => {
                diag.error(format!(
                    "measure {}: invalid alter '{}', using natural",
                    measure_number, text
                ));
                0
            }
        },
    };

    Some(Pitch { step, alter, octave })
}

fn parse_tie(note_node: Node) -> Option<Tie> {
    let mut start = false;
    let mut stop = false;
    for tie in note_node.children().filter(|n| n.has_tag_name("tie")) {
        match tie.attribute("type") {
            Some("start") => start = true,
            Some("stop") => stop = true,
            _ => {}
        }
    }
    match (start, stop) {
        (true, true) => Some(Tie::Continue),
        (true, false) => Some(Tie::Start),
        (false, true) => Some(Tie::Stop),
        (false, false) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::scan_structure;

    fn build(xml: &str) -> (Score, Diagnostics) {
        let doc = Document::parse(xml).expect("fixture must be valid xml");
        let mut diag = Diagnostics::default();
        let structure = scan_structure(&doc, &mut diag).expect("structure scan failed");
        let score = build_score(&doc, &structure, &mut diag);
        (score, diag)
    }

    fn wrap_measures(measures: &str) -> String {
        format!(
            r#"<score-partwise>
  <part-list><score-part id="P1"><part-name>Piano</part-name></score-part></part-list>
  <part id="P1">{}</part>
</score-partwise>"#,
            measures
        )
    }

    #[test]
    fn durations_are_exact_rationals() {
        let (score, diag) = build(&wrap_measures(
            r#"<measure number="1">
  <attributes><divisions>3</divisions></attributes>
  <note><pitch><step>C</step><octave>4</octave></pitch><duration>1</duration></note>
  <note><pitch><step>D</step><octave>4</octave></pitch><duration>1</duration></note>
  <note><pitch><step>E</step><octave>4</octave></pitch><duration>1</duration></note>
</measure>"#,
        ));
        let notes = &score.parts[0].measures[0].notes;
        assert_eq!(notes[0].duration, Rational64::new(1, 3));
        assert_eq!(notes[1].start_time, Rational64::new(1, 3));
        assert_eq!(notes[2].start_time, Rational64::new(2, 3));
        assert!(diag.errors.is_empty());
    }

    #[test]
    fn divisions_inherit_across_measures() {
        let (score, _) = build(&wrap_measures(
            r#"<measure number="1">
  <attributes><divisions>2</divisions></attributes>
  <note><pitch><step>C</step><octave>4</octave></pitch><duration>2</duration></note>
</measure>
<measure number="2">
  <note><pitch><step>D</step><octave>4</octave></pitch><duration>1</duration></note>
</measure>"#,
        ));
        assert_eq!(
            score.parts[0].measures[1].notes[0].duration,
            Rational64::new(1, 2)
        );
    }

    #[test]
    fn chord_notes_share_start_time() {
        let (score, _) = build(&wrap_measures(
            r#"<measure number="1">
  <attributes><divisions>4</divisions></attributes>
  <note><pitch><step>C</step><octave>4</octave></pitch><duration>4</duration></note>
  <note><chord/><pitch><step>E</step><octave>4</octave></pitch><duration>4</duration></note>
  <note><chord/><pitch><step>G</step><octave>4</octave></pitch><duration>4</duration></note>
  <note><pitch><step>B</step><octave>3</octave></pitch><duration>4</duration></note>
</measure>"#,
        ));
        let notes = &score.parts[0].measures[0].notes;
        assert_eq!(notes[1].start_time, notes[0].start_time);
        assert!(notes[1].is_chord);
        assert_eq!(notes[2].start_time, notes[0].start_time);
        // the next plain note starts one quarter later, not three
        assert_eq!(notes[3].start_time, Rational64::from_integer(1));
    }

    #[test]
    fn voices_keep_independent_cursors() {
        let (score, _) = build(&wrap_measures(
            r#"<measure number="1">
  <attributes><divisions>1</divisions></attributes>
  <note><pitch><step>C</step><octave>5</octave></pitch><duration>2</duration><voice>1</voice></note>
  <note><pitch><step>C</step><octave>3</octave></pitch><duration>1</duration><voice>2</voice></note>
  <note><pitch><step>D</step><octave>3</octave></pitch><duration>1</duration><voice>2</voice></note>
</measure>"#,
        ));
        let notes = &score.parts[0].measures[0].notes;
        assert_eq!(notes[1].start_time, Rational64::from_integer(0));
        assert_eq!(notes[2].start_time, Rational64::from_integer(1));
    }

    #[test]
    fn rest_notes_have_no_pitch() {
        let (score, _) = build(&wrap_measures(
            r#"<measure number="1">
  <attributes><divisions>1</divisions></attributes>
  <note><rest/><duration>4</duration></note>
</measure>"#,
        ));
        let note = &score.parts[0].measures[0].notes[0];
        assert!(note.is_rest);
        assert_eq!(note.pitch, None);
    }

    #[test]
    fn unparseable_pitch_becomes_rest_with_error() {
        let (score, diag) = build(&wrap_measures(
            r#"<measure number="1">
  <attributes><divisions>1</divisions></attributes>
  <note><pitch><step>H</step><octave>4</octave></pitch><duration>1</duration></note>
</measure>"#,
        ));
        let note = &score.parts[0].measures[0].notes[0];
        assert!(note.is_rest);
        assert_eq!(note.pitch, None);
        assert_eq!(diag.errors.len(), 1);
    }

    #[test]
    fn out_of_range_alter_is_recorded_and_naturalized() {
        let (score, diag) = build(&wrap_measures(
            r#"<measure number="1">
  <attributes><divisions>1</divisions></attributes>
  <note><pitch><step>C</step><alter>3</alter><octave>4</octave></pitch><duration>1</duration></note>
</measure>"#,
        ));
        let note = &score.parts[0].measures[0].notes[0];
        assert_eq!(note.pitch.unwrap().label(), "C4");
        assert_eq!(diag.errors.len(), 1);
    }

    #[test]
    fn missing_duration_defaults_to_zero() {
        let (score, diag) = build(&wrap_measures(
            r#"<measure number="1">
  <attributes><divisions>1</divisions></attributes>
  <note><pitch><step>C</step><octave>4</octave></pitch></note>
  <note><pitch><step>D</step><octave>4</octave></pitch><duration>1</duration></note>
</measure>"#,
        ));
        let notes = &score.parts[0].measures[0].notes;
        assert_eq!(notes[0].duration, Rational64::from_integer(0));
        assert_eq!(notes[1].start_time, Rational64::from_integer(0));
        assert_eq!(diag.errors.len(), 1);
    }

    #[test]
    fn barline_repeat_markers() {
        let (score, _) = build(&wrap_measures(
            r#"<measure number="1">
  <barline location="left"><repeat direction="forward"/></barline>
</measure>
<measure number="2">
  <barline location="right"><repeat direction="backward" times="3"/></barline>
</measure>"#,
        ));
        let measures = &score.parts[0].measures;
        assert!(measures[0].repeat_start);
        assert!(measures[1].repeat_end);
        assert_eq!(measures[1].repeat_count, 3);
    }

    #[test]
    fn backward_repeat_defaults_to_two() {
        let (score, _) = build(&wrap_measures(
            r#"<measure number="1">
  <barline location="right"><repeat direction="backward"/></barline>
</measure>"#,
        ));
        assert_eq!(score.parts[0].measures[0].repeat_count, 2);
    }

    #[test]
    fn stop_beats_start_across_barline_edges() {
        let (score, _) = build(&wrap_measures(
            r#"<measure number="1">
  <barline location="left"><ending number="2" type="start"/></barline>
  <barline location="right"><ending number="2" type="stop"/></barline>
</measure>"#,
        ));
        let measure = &score.parts[0].measures[0];
        assert_eq!(measure.volta_type, VoltaType::Stop);
        assert_eq!(measure.volta_numbers, vec![2]);
    }

    #[test]
    fn ending_numbers_union_comma_lists() {
        let (score, _) = build(&wrap_measures(
            r#"<measure number="1">
  <barline location="left"><ending number="1,2" type="start"/></barline>
  <barline location="right"><ending number="2" type="stop"/></barline>
</measure>"#,
        ));
        assert_eq!(score.parts[0].measures[0].volta_numbers, vec![1, 2]);
    }

    #[test]
    fn metronome_beat_unit_scales_to_quarter_bpm() {
        let (score, _) = build(&wrap_measures(
            r#"<measure number="1">
  <direction>
    <direction-type><metronome><beat-unit>half</beat-unit><per-minute>60</per-minute></metronome></direction-type>
  </direction>
</measure>"#,
        ));
        assert_eq!(score.parts[0].measures[0].tempo_bpm, Some(120.0));
        assert_eq!(score.tempo_bpm, Some(120.0));
    }

    #[test]
    fn sound_tempo_sets_override() {
        let (score, _) = build(&wrap_measures(
            r#"<measure number="1">
  <sound tempo="96"/>
</measure>"#,
        ));
        assert_eq!(score.parts[0].measures[0].tempo_bpm, Some(96.0));
    }

    #[test]
    fn tie_types_parse() {
        let (score, _) = build(&wrap_measures(
            r#"<measure number="1">
  <attributes><divisions>1</divisions></attributes>
  <note><pitch><step>E</step><octave>4</octave></pitch><duration>1</duration><tie type="start"/></note>
  <note><pitch><step>E</step><octave>4</octave></pitch><duration>1</duration><tie type="stop"/><tie type="start"/></note>
  <note><pitch><step>E</step><octave>4</octave></pitch><duration>1</duration><tie type="stop"/></note>
</measure>"#,
        ));
        let notes = &score.parts[0].measures[0].notes;
        assert_eq!(notes[0].tie, Some(Tie::Start));
        assert_eq!(notes[1].tie, Some(Tie::Continue));
        assert_eq!(notes[2].tie, Some(Tie::Stop));
    }

    #[test]
    fn time_signature_change_applies_forward() {
        let (score, _) = build(&wrap_measures(
            r#"<measure number="1">
  <attributes><divisions>1</divisions><time><beats>3</beats><beat-type>4</beat-type></time></attributes>
</measure>
<measure number="2"/>
<measure number="3">
  <attributes><time><beats>4</beats><beat-type>4</beat-type></time></attributes>
</measure>"#,
        ));
        let measures = &score.parts[0].measures;
        assert_eq!(measures[0].time_signature, (3, 4));
        assert_eq!(measures[1].time_signature, (3, 4));
        assert_eq!(measures[2].time_signature, (4, 4));
        assert_eq!(score.time_signature, (3, 4));
    }
}
