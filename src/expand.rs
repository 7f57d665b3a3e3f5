//! Repeat and volta expansion.
//!
//! Flattens the notated measure order of each part into playback order:
//! repeat sections are matched with an explicit stack (nesting supported),
//! each iteration filters measures by their ending ordinals, and every
//! emitted measure is a deep clone tagged with its provenance.

use crate::diagnostics::Diagnostics;
use crate::error::ResourceLimitError;
use crate::model::{Measure, Part, RepeatTag, Score, VoltaType};

/// Safety bounds applied while expanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpandLimits {
    /// Upper bound on the total number of emitted measures across all parts.
    pub max_measures: usize,
}

impl Default for ExpandLimits {
    fn default() -> Self {
        ExpandLimits { max_measures: 100_000 }
    }
}

/// Expands repeats and voltas of a score into a new, fully independent score.
#[derive(Debug, Clone, Default)]
pub struct RepeatExpander {
    limits: ExpandLimits,
}

/// One node of the analyzed repeat structure of a part.
#[derive(Debug)]
enum Segment {
    /// A measure outside any repeat section, emitted once.
    Single(usize),
    Repeat(Section),
}

#[derive(Debug)]
struct Section {
    start: usize,
    end: usize,
    count: i32,
    children: Vec<Segment>,
}

impl RepeatExpander {
    pub fn new() -> Self {
        RepeatExpander { limits: ExpandLimits::default() }
    }

    pub fn with_limits(limits: ExpandLimits) -> Self {
        RepeatExpander { limits }
    }

    /// Expand the score into playback order.
    ///
    /// On success the returned score owns a completely separate measure
    /// graph; the input is untouched. If the measure bound is exceeded the
    /// error carries the partial expansion produced so far.
    pub fn expand(&self, score: &Score) -> Result<Score, ResourceLimitError> {
        let mut diag = Diagnostics::default();
        let mut expanded = Score {
            title: score.title.clone(),
            composer: score.composer.clone(),
            tempo_bpm: score.tempo_bpm,
            time_signature: score.time_signature,
            key_fifths: score.key_fifths,
            parts: Vec::new(),
            errors: score.errors.clone(),
            warnings: score.warnings.clone(),
        };

        let mut emitted = 0usize;
        let mut limit_hit = false;
        for part in &score.parts {
            let mut segments = analyze_part(part, &mut diag);
            validate_segments(&mut segments, part, &mut diag);

            let mut measures = Vec::new();
            let ok = emit_segments(
                part,
                &segments,
                &mut measures,
                &mut emitted,
                self.limits.max_measures,
            );
            expanded.parts.push(Part { measures, ..part_header(part) });
            if !ok {
                limit_hit = true;
                break;
            }
        }

        expanded.errors.extend(diag.errors);
        expanded.warnings.extend(diag.warnings);

        if limit_hit {
            Err(ResourceLimitError {
                emitted,
                limit: self.limits.max_measures,
                partial: Box::new(expanded),
            })
        } else {
            Ok(expanded)
        }
    }
}

fn part_header(part: &Part) -> Part {
    Part {
        id: part.id.clone(),
        name: part.name.clone(),
        instrument: part.instrument.clone(),
        staves: part.staves,
        midi_channel: part.midi_channel,
        midi_program: part.midi_program,
        measures: Vec::new(),
    }
}

/// Match repeat starts and ends into a segment tree.
///
/// A repeat end with no open start closes back to the previous resolved
/// top-level boundary (implicit forward repeat), or to the part start for
/// the first section. Starts still open at the end of the part are emitted
/// once with a warning.
fn analyze_part(part: &Part, diag: &mut Diagnostics) -> Vec<Segment> {
    let mut top: Vec<Segment> = Vec::new();
    // Open sections: (start index, children accumulated so far).
    let mut open: Vec<(usize, Vec<Segment>)> = Vec::new();
    // Position in `top` just after the last resolved top-level section.
    let mut boundary = 0usize;

    for (i, measure) in part.measures.iter().enumerate() {
        if measure.repeat_start {
            open.push((i, Vec::new()));
        }

        match open.last_mut() {
            Some((_, children)) => children.push(Segment::Single(i)),
            None => top.push(Segment::Single(i)),
        }

        if measure.repeat_end {
            if let Some((start, children)) = open.pop() {
                let section = Section { start, end: i, count: measure.repeat_count, children };
                match open.last_mut() {
                    Some((_, parent)) => parent.push(Segment::Repeat(section)),
                    None => {
                        top.push(Segment::Repeat(section));
                        boundary = top.len();
                    }
                }
            } else {
                let children: Vec<Segment> = top.drain(boundary..).collect();
                let start = children
                    .first()
                    .map(|seg| match seg {
                        Segment::Single(idx) => *idx,
                        Segment::Repeat(section) => section.start,
                    })
                    .unwrap_or(i);
                top.push(Segment::Repeat(Section {
                    start,
                    end: i,
                    count: measure.repeat_count,
                    children,
                }));
                boundary = top.len();
            }
        }
    }

    while let Some((start, children)) = open.pop() {
        diag.warning(format!(
            "unmatched repeat start at measure {}, playing through once",
            part.measures[start].number
        ));
        match open.last_mut() {
            Some((_, parent)) => parent.extend(children),
            None => top.extend(children),
        }
    }

    top
}

/// Clamp repeat counts and warn about malformed volta structure. Runs once
/// per section, before emission, so nested sections replayed by an outer
/// iteration do not repeat their warnings.
fn validate_segments(segments: &mut [Segment], part: &Part, diag: &mut Diagnostics) {
    for segment in segments.iter_mut() {
        match segment {
            Segment::Single(_) => {}
            Segment::Repeat(section) => {
                if section.count <= 0 {
                    diag.warning(format!(
                        "repeat over measures {}..{} has count {}, clamping to 1",
                        part.measures[section.start].number,
                        part.measures[section.end].number,
                        section.count
                    ));
                    section.count = 1;
                }
                warn_unpartnered_voltas(section, part, diag);
                validate_segments(&mut section.children, part, diag);
            }
        }
    }
}

fn warn_unpartnered_voltas(section: &Section, part: &Part, diag: &mut Diagnostics) {
    let mut open_start: Option<u32> = None;
    for child in &section.children {
        let Segment::Single(idx) = child else { continue };
        let measure = &part.measures[*idx];
        match measure.volta_type {
            VoltaType::Start => {
                if let Some(number) = open_start {
                    diag.warning(format!(
                        "ending starting at measure {} has no stop or discontinue partner",
                        number
                    ));
                }
                open_start = Some(measure.number);
            }
            VoltaType::Stop | VoltaType::Discontinue => open_start = None,
            VoltaType::None => {}
        }
    }
    if let Some(number) = open_start {
        diag.warning(format!(
            "ending starting at measure {} has no stop or discontinue partner",
            number
        ));
    }
}

/// Emit a segment list into `out`. Returns false when the measure bound was
/// hit, in which case `out` holds the partial expansion.
fn emit_segments(
    part: &Part,
    segments: &[Segment],
    out: &mut Vec<Measure>,
    emitted: &mut usize,
    limit: usize,
) -> bool {
    for segment in segments {
        match segment {
            Segment::Single(idx) => {
                if !push_clone(part.measures[*idx].clone(), out, emitted, limit) {
                    return false;
                }
            }
            Segment::Repeat(section) => {
                if !emit_section(part, section, out, emitted, limit) {
                    return false;
                }
            }
        }
    }
    true
}

fn emit_section(
    part: &Part,
    section: &Section,
    out: &mut Vec<Measure>,
    emitted: &mut usize,
    limit: usize,
) -> bool {
    let section_id = format!("{}:{}-{}", part.id, section.start, section.end);
    let total = section.count.max(1) as u32;

    for k in 1..=total {
        let mut discontinue = false;
        for child in &section.children {
            match child {
                Segment::Single(idx) => {
                    let measure = &part.measures[*idx];
                    if !measure.volta_numbers.is_empty() && !measure.volta_numbers.contains(&k) {
                        if measure.volta_type == VoltaType::Discontinue {
                            discontinue = true;
                        }
                        continue;
                    }
                    let mut clone = measure.clone();
                    clone.repeat = Some(RepeatTag {
                        iteration: k - 1,
                        section_id: section_id.clone(),
                        ending_label: if measure.volta_numbers.is_empty() {
                            "main".to_string()
                        } else {
                            format!("volta_{}", k)
                        },
                        total_iterations: total,
                    });
                    if !push_clone(clone, out, emitted, limit) {
                        return false;
                    }
                }
                Segment::Repeat(inner) => {
                    if !emit_section(part, inner, out, emitted, limit) {
                        return false;
                    }
                }
            }
        }
        if discontinue {
            break;
        }
    }
    true
}

fn push_clone(measure: Measure, out: &mut Vec<Measure>, emitted: &mut usize, limit: usize) -> bool {
    if *emitted >= limit {
        return false;
    }
    *emitted += 1;
    out.push(measure);
    true
}
