//! MusicXML score parsing, repeat expansion, and dual-timeline sequencing.
//!
//! The pipeline is strictly linear: a parsed document is scanned for
//! structure, built into a [`Score`] graph with exact rational timing,
//! expanded into playback order, and sequenced into an event list that
//! carries both playback and notation-cursor milliseconds per note.
//!
//! # Example
//!
//! ```
//! let xml = r#"<score-partwise>
//!   <part-list><score-part id="P1"><part-name>Piano</part-name></score-part></part-list>
//!   <part id="P1">
//!     <measure number="1">
//!       <attributes><divisions>1</divisions></attributes>
//!       <note><pitch><step>C</step><octave>4</octave></pitch><duration>4</duration></note>
//!     </measure>
//!   </part>
//! </score-partwise>"#;
//!
//! let score = scoreline::parse_str(xml)?;
//! let expanded = scoreline::RepeatExpander::new().expand(&score)?;
//! let timeline = scoreline::sequence(&score, &expanded);
//! assert_eq!(timeline.events.len(), 1);
//! assert_eq!(timeline.events[0].pitch.as_deref(), Some("C4"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod build;
pub mod diagnostics;
pub mod error;
pub mod expand;
pub mod midi;
pub mod model;
pub mod scan;
pub mod timeline;

mod xml;

pub use error::{ParseError, ResourceLimitError, StructuralError};
pub use expand::{ExpandLimits, RepeatExpander};
pub use model::{Measure, Note, Part, Pitch, RepeatTag, Score, Tie, VoltaType};
pub use scan::{scan_structure, PartInfo, ScoreStructure};
pub use timeline::{sequence, HandSplit, NoteEvent, PlaybackEvent, TempoMap, Timeline};

use roxmltree::Document;

use crate::diagnostics::Diagnostics;

/// Parse an already-loaded document tree into the original score.
///
/// Fails only on the structural conditions of the first pass; everything
/// else is recorded on the returned score.
pub fn parse_document(doc: &Document) -> Result<Score, StructuralError> {
    let mut diag = Diagnostics::default();
    let structure = scan::scan_structure(doc, &mut diag)?;
    let mut score = build::build_score(doc, &structure, &mut diag);
    score.errors = diag.errors;
    score.warnings = diag.warnings;
    log::info!(
        "parsed score '{}' by {}: {} parts, {} errors, {} warnings",
        score.title,
        score.composer,
        score.parts.len(),
        score.errors.len(),
        score.warnings.len()
    );
    Ok(score)
}

/// Parse MusicXML text into the original score.
pub fn parse_str(xml: &str) -> Result<Score, ParseError> {
    let doc = Document::parse(xml)?;
    Ok(parse_document(&doc)?)
}
