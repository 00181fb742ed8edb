//! Pure helpers that collapse chunk hits into per-note scores.

use crate::{
    models::{Note, ScoredNote},
    vector::VectorHit,
};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Group hits by note, keeping each note's maximum score.
///
/// Notes are returned in the order their first hit appeared.
pub fn best_score_per_note(hits: &[VectorHit]) -> Vec<(Uuid, f32)> {
    let mut positions: HashMap<Uuid, usize> = HashMap::new();
    let mut grouped: Vec<(Uuid, f32)> = Vec::new();
    for hit in hits {
        match positions.get(&hit.note_id) {
            Some(&at) => {
                if hit.score > grouped[at].1 {
                    grouped[at].1 = hit.score;
                }
            }
            None => {
                positions.insert(hit.note_id, grouped.len());
                grouped.push((hit.note_id, hit.score));
            }
        }
    }
    grouped
}

/// Keep only the first hit seen for each note.
pub fn first_hit_per_note(hits: &[VectorHit]) -> Vec<(Uuid, f32)> {
    let mut seen = HashSet::new();
    hits.iter()
        .filter(|hit| seen.insert(hit.note_id))
        .map(|hit| (hit.note_id, hit.score))
        .collect()
}

/// Pair scores with fetched notes, dropping ids that no longer resolve to a note.
pub fn attach_notes(scores: &[(Uuid, f32)], notes: &mut HashMap<Uuid, Note>) -> Vec<ScoredNote> {
    scores
        .iter()
        .filter_map(|(note_id, score)| {
            notes.remove(note_id).map(|note| ScoredNote {
                note,
                score: *score,
            })
        })
        .collect()
}

/// Stable descending sort by score; equal scores keep their input order.
pub fn sort_by_score_desc(results: &mut [ScoredNote]) {
    results.sort_by(|a, b| b.score.total_cmp(&a.score));
}
