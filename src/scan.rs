//! First pass: structure scan.
//!
//! Walks the document once to collect score metadata and the ordered list of
//! part descriptors. No note-level data is read here; the content builder
//! consumes the descriptor this pass produces.

use roxmltree::{Document, Node};

use crate::diagnostics::Diagnostics;
use crate::error::StructuralError;
use crate::xml::{child, child_text};

/// Structure descriptor produced by the first pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreStructure {
    pub title: String,
    pub composer: String,
    /// Default ticks-per-quarter-note resolution, from the first measure
    /// carrying a divisions attribute.
    pub divisions: u32,
    pub parts: Vec<PartInfo>,
}

/// Per-part metadata from the part-list, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct PartInfo {
    pub id: String,
    pub name: String,
    pub instrument: String,
    pub staves: u32,
    pub midi_channel: u8,
    pub midi_program: u8,
}

/// Scan the document for structure and metadata.
///
/// The only fatal conditions of the whole parse live here: a missing
/// part-list, or a part-list declaring no parts. Everything else degrades to
/// a recorded diagnostic.
pub fn scan_structure(
    doc: &Document,
    diag: &mut Diagnostics,
) -> Result<ScoreStructure, StructuralError> {
    let root = doc.root_element();

    let title = root
        .descendants()
        .find(|n| n.has_tag_name("work-title"))
        .and_then(|n| n.text())
        .unwrap_or("Untitled")
        .to_string();
    let composer = root
        .descendants()
        .find(|n| n.has_tag_name("creator") && n.attribute("type") == Some("composer"))
        .and_then(|n| n.text())
        .unwrap_or("Unknown")
        .to_string();

    let part_list = child(root, "part-list").ok_or(StructuralError::MissingPartList)?;

    let mut parts = Vec::new();
    for score_part in part_list.children().filter(|n| n.has_tag_name("score-part")) {
        let Some(id) = score_part.attribute("id") else {
            diag.warning("score-part missing id attribute");
            continue;
        };
        let name = child_text(score_part, "part-name")
            .map(str::to_string)
            .unwrap_or_else(|| format!("Part {}", id));
        let instrument = score_part
            .descendants()
            .find(|n| n.has_tag_name("instrument-name"))
            .and_then(|n| n.text())
            .unwrap_or("Piano")
            .to_string();

        parts.push(PartInfo {
            id: id.to_string(),
            name,
            instrument,
            staves: 1,
            midi_channel: scan_midi_number(score_part, "midi-channel", 1, diag),
            midi_program: scan_midi_number(score_part, "midi-program", 1, diag),
        });
    }
    if parts.is_empty() {
        return Err(StructuralError::NoParts);
    }
    if !root.children().any(|n| n.has_tag_name("part")) {
        return Err(StructuralError::NoParts);
    }

    // Staff counts and the default divisions come from each part body's
    // opening attributes.
    let mut divisions = 4u32;
    let mut divisions_seen = false;
    for part_node in root.children().filter(|n| n.has_tag_name("part")) {
        let Some(id) = part_node.attribute("id") else { continue };
        let Some(info) = parts.iter_mut().find(|p| p.id == id) else { continue };
        let Some(first_measure) = child(part_node, "measure") else { continue };
        let Some(attrs) = child(first_measure, "attributes") else { continue };

        if let Some(text) = child_text(attrs, "staves") {
            match text.trim().parse::<u32>() {
                Ok(n) if n > 0 => info.staves = n,
                _ => diag.warning(format!("part {}: invalid staves count '{}'", id, text)),
            }
        }
        if !divisions_seen {
            if let Some(text) = child_text(attrs, "divisions") {
                match text.trim().parse::<u32>() {
                    Ok(n) if n > 0 => {
                        divisions = n;
                        divisions_seen = true;
                    }
                    _ => diag.warning(format!("part {}: invalid divisions '{}'", id, text)),
                }
            }
        }
    }

    Ok(ScoreStructure { title, composer, divisions, parts })
}

fn scan_midi_number(score_part: Node, name: &str, default: u8, diag: &mut Diagnostics) -> u8 {
    let Some(node) = score_part.descendants().find(|n| n.has_tag_name(name)) else {
        return default;
    };
    match node.text().map(str::trim).map(str::parse::<u8>) {
        Some(Ok(n)) => n,
        _ => {
            diag.warning(format!("invalid {} value '{}'", name, node.text().unwrap_or("")));
            default
        }
    }
}
