// Musical systems: path-to-note assignments, their chord listings, and the
// JSON store they are persisted in.
//
// An `Assignment` is the solver's working state (path number -> note). A
// `MusicalSystem` is the published record: the assignment keyed by decimal
// path strings ("11".."32") plus a derived chord listing for every
// Tree-Triad and sephirah grouping. The record's field names are the ones
// the tree UI reads, so they are kept as-is in the serialized form.
//
// `SystemStore` appends records to a JSON object keyed by system name. It
// treats existing entries as opaque JSON so hand-written systems with other
// shapes survive a round trip untouched.

use crate::chord::{detect_all, is_consonant};
use crate::error::{Error, Result};
use crate::pitch::{Note, PitchSet};
use crate::tree::{PathNumber, TREE_TRIADS, path_numbers, sephirah_groupings};
use crate::world::{Triad, World, WorldName};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

// ---------------------------------------------------------------------------
// Assignment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assignment {
    notes: BTreeMap<PathNumber, Note>,
}

impl Assignment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: PathNumber) -> Option<Note> {
        self.notes.get(&path).copied()
    }

    pub fn set(&mut self, path: PathNumber, note: Note) {
        self.notes.insert(path, note);
    }

    pub fn is_assigned(&self, path: PathNumber) -> bool {
        self.notes.contains_key(&path)
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Unassigned path numbers, ascending.
    pub fn unassigned(&self) -> Vec<PathNumber> {
        path_numbers().filter(|p| !self.is_assigned(*p)).collect()
    }

    pub fn is_complete(&self) -> bool {
        path_numbers().all(|p| self.is_assigned(p))
    }

    /// Every pitch class used on any path.
    pub fn used(&self) -> PitchSet {
        self.notes.values().map(|n| n.pitch_class()).collect()
    }

    /// Distinct notes on the given paths, in path order. Unassigned paths are
    /// skipped.
    pub fn tones(&self, paths: &[PathNumber]) -> Vec<Note> {
        let mut tones: Vec<Note> = Vec::with_capacity(paths.len());
        for note in paths.iter().filter_map(|&p| self.get(p)) {
            if !tones.contains(&note) {
                tones.push(note);
            }
        }
        tones
    }

    pub fn iter(&self) -> impl Iterator<Item = (PathNumber, Note)> + '_ {
        self.notes.iter().map(|(&p, &n)| (p, n))
    }
}

// ---------------------------------------------------------------------------
// Chord listing
// ---------------------------------------------------------------------------

/// Coarse consonance tag shown next to each grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Consonance {
    #[serde(rename = "😌")]
    Calm,
    #[serde(rename = "🌶️")]
    Spicy,
    #[serde(rename = "N/A")]
    Empty,
}

impl Consonance {
    /// A lone tone counts as calm; two or more are calm only when they form
    /// a recognized chord.
    pub fn of(tones: &[Note]) -> Consonance {
        match tones.len() {
            0 => Consonance::Empty,
            _ if is_consonant(tones) => Consonance::Calm,
            _ => Consonance::Spicy,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChordEntry {
    /// Grouping name, e.g. "Supernal Tree-Triad" or "Hod (Above)".
    pub chord: String,
    pub path_numbers: Vec<PathNumber>,
    pub chord_tones: Vec<Note>,
    pub chord_name: String,
    pub notes: String,
    pub spice: Consonance,
}

impl ChordEntry {
    pub fn build(name: &str, paths: &[PathNumber], assignment: &Assignment) -> ChordEntry {
        let tones = assignment.tones(paths);
        let detections: Vec<String> = if tones.len() > 1 {
            detect_all(&tones).iter().map(|c| c.to_string()).collect()
        } else {
            Vec::new()
        };
        let chord_name = detections
            .first()
            .cloned()
            .or_else(|| tones.first().map(|n| n.to_string()))
            .unwrap_or_else(|| "Unknown".to_string());
        let notes = if detections.is_empty() {
            "No clear chord".to_string()
        } else {
            detections.join(", ")
        };
        ChordEntry {
            chord: name.to_string(),
            path_numbers: paths.to_vec(),
            spice: Consonance::of(&tones),
            chord_tones: tones,
            chord_name,
            notes,
        }
    }

    pub fn signature(&self) -> PitchSet {
        self.chord_tones.iter().map(|n| n.pitch_class()).collect()
    }
}

/// Tree-Triads first, then every sephirah grouping in tree order.
pub fn chord_listing(assignment: &Assignment) -> Vec<ChordEntry> {
    let triads = TREE_TRIADS
        .iter()
        .map(|t| ChordEntry::build(t.name, &t.paths, assignment));
    let groupings = sephirah_groupings()
        .into_iter()
        .map(|g| ChordEntry::build(&g.name, &g.paths, assignment));
    triads.chain(groupings).collect()
}

/// How many distinct world triads appear exactly (as pitch-class sets) in
/// the listing.
pub fn distinct_triads_found(chords: &[ChordEntry], triads: &[Triad]) -> usize {
    let wanted: BTreeSet<PitchSet> = triads.iter().map(|t| t.signature()).collect();
    chords
        .iter()
        .map(|c| c.signature())
        .filter(|s| wanted.contains(s))
        .collect::<BTreeSet<_>>()
        .len()
}

// ---------------------------------------------------------------------------
// Published record
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MusicalSystem {
    pub world: String,
    pub description: String,
    pub references: Vec<String>,
    pub system: String,
    pub assignments: BTreeMap<String, Note>,
    pub chords: Vec<ChordEntry>,
}

impl MusicalSystem {
    pub fn from_assignment(world: &World, assignment: &Assignment, name: String) -> Self {
        MusicalSystem {
            world: world.name.as_str().to_lowercase(),
            description: format!(
                "Hybrid Generated System for {} with Complete Triad Coverage.",
                world.name
            ),
            references: Vec::new(),
            system: name,
            assignments: assignment
                .iter()
                .map(|(p, n)| (p.to_string(), n))
                .collect(),
            chords: chord_listing(assignment),
        }
    }

    /// `Hybrid_{World}_{date}`.
    pub fn system_name(world: WorldName, date: &str) -> String {
        format!("Hybrid_{world}_{date}")
    }

    pub fn note_for_path(&self, path: PathNumber) -> Option<Note> {
        self.assignments.get(&path.to_string()).copied()
    }

    pub fn missing_paths(&self) -> Vec<PathNumber> {
        path_numbers()
            .filter(|p| self.note_for_path(*p).is_none())
            .collect()
    }

    /// Rebuild the working assignment. Keys outside 11-32 are rejected.
    pub fn assignment(&self) -> Result<Assignment> {
        let mut assignment = Assignment::new();
        for (key, &note) in &self.assignments {
            let path: PathNumber = key
                .parse()
                .ok()
                .filter(|p| path_numbers().any(|q| q == *p))
                .ok_or_else(|| Error::InvalidSystem(format!("unknown path key {key:?}")))?;
            assignment.set(path, note);
        }
        Ok(assignment)
    }

    /// Check the acceptance invariants against a world: every path assigned,
    /// each Tree-Triad a world triad, full palette coverage, and at least
    /// `min_triads` distinct triads across the listing.
    pub fn verify(&self, world: &World, min_triads: usize) -> Result<()> {
        let assignment = self.assignment()?;
        let missing = self.missing_paths();
        if !missing.is_empty() {
            return Err(Error::InvalidSystem(format!("unassigned paths {missing:?}")));
        }

        let triads = world.triads();
        for tree_triad in TREE_TRIADS {
            let tones: PitchSet = assignment
                .tones(&tree_triad.paths)
                .iter()
                .map(|n| n.pitch_class())
                .collect();
            if !triads.iter().any(|t| t.signature() == tones) {
                return Err(Error::InvalidSystem(format!(
                    "{} is not a {} triad",
                    tree_triad.name, world.name
                )));
            }
        }

        let palette = world.palette_set();
        if !palette.is_subset(assignment.used()) {
            return Err(Error::InvalidSystem(format!(
                "palette tones unused: {:?}",
                palette
                    .iter()
                    .filter(|pc| !assignment.used().contains(*pc))
                    .map(|pc| world.spell(pc).to_string())
                    .collect::<Vec<_>>()
            )));
        }

        let found = distinct_triads_found(&chord_listing(&assignment), &triads);
        if found < min_triads {
            return Err(Error::InvalidSystem(format!(
                "only {found} of {min_triads} triads realized"
            )));
        }
        Ok(())
    }
}

/// UTC calendar date (YYYY-MM-DD) of a point in time.
pub fn iso_date(time: SystemTime) -> String {
    let days = time
        .duration_since(UNIX_EPOCH)
        .map(|d| (d.as_secs() / 86_400) as i64)
        .unwrap_or(0);
    let (y, m, d) = civil_from_days(days);
    format!("{y:04}-{m:02}-{d:02}")
}

// Days since 1970-01-01 to a proleptic Gregorian (year, month, day).
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = (if z >= 0 { z } else { z - 146_096 }) / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}

// ---------------------------------------------------------------------------
// JSON store
// ---------------------------------------------------------------------------

pub const DEFAULT_STORE_PATH: &str = "musicalSystems.json";

/// A JSON object of musical systems keyed by system name.
#[derive(Debug, Clone)]
pub struct SystemStore {
    path: PathBuf,
}

impl SystemStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SystemStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw entries; a missing file is an empty store.
    pub fn load_raw(&self) -> Result<serde_json::Map<String, serde_json::Value>> {
        if !self.path.exists() {
            return Ok(serde_json::Map::new());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn names(&self) -> Result<Vec<String>> {
        Ok(self.load_raw()?.keys().cloned().collect())
    }

    pub fn get(&self, name: &str) -> Result<Option<MusicalSystem>> {
        match self.load_raw()?.remove(name) {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Insert (or replace) a system under its own name and rewrite the file.
    pub fn append(&self, system: &MusicalSystem) -> Result<()> {
        let mut entries = self.load_raw()?;
        entries.insert(system.system.clone(), serde_json::to_value(system)?);
        let json = serde_json::to_string_pretty(&entries)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pitch::PitchClass;
    use std::time::Duration;

    fn note(name: &str) -> Note {
        name.parse().unwrap()
    }

    #[test]
    fn test_tones_deduplicate_in_path_order() {
        let mut a = Assignment::new();
        a.set(11, note("G"));
        a.set(12, note("Eb"));
        a.set(13, note("G"));
        let tones = a.tones(&[11, 12, 13, 14]);
        assert_eq!(tones, vec![note("G"), note("D#")]);
    }

    #[test]
    fn test_consonance_tags() {
        assert_eq!(Consonance::of(&[]), Consonance::Empty);
        assert_eq!(Consonance::of(&[note("C")]), Consonance::Calm);
        assert_eq!(Consonance::of(&[note("C"), note("E"), note("G")]), Consonance::Calm);
        assert_eq!(Consonance::of(&[note("C"), note("C#")]), Consonance::Spicy);
        assert_eq!(Consonance::of(&[note("D"), note("F#"), note("A"), note("C")]), Consonance::Calm);
        assert_eq!(serde_json::to_string(&Consonance::Spicy).unwrap(), "\"🌶️\"");
    }

    #[test]
    fn test_chord_entry_single_tone() {
        let mut a = Assignment::new();
        a.set(11, note("Bb"));
        let entry = ChordEntry::build("Hockmah (Above)", &[11], &a);
        assert_eq!(entry.chord_name, "B♭");
        assert_eq!(entry.notes, "No clear chord");
        assert_eq!(entry.spice, Consonance::Calm);
    }

    #[test]
    fn test_chord_entry_triad() {
        let mut a = Assignment::new();
        a.set(11, note("G"));
        a.set(12, note("Bb"));
        a.set(14, note("Eb"));
        let entry = ChordEntry::build("Supernal Tree-Triad", &[11, 12, 14], &a);
        assert_eq!(entry.chord_name, "E♭M");
        assert_eq!(entry.spice, Consonance::Calm);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["path_numbers"], serde_json::json!([11, 12, 14]));
        assert_eq!(json["chord_tones"], serde_json::json!(["G", "B♭", "E♭"]));
    }

    #[test]
    fn test_listing_has_all_groupings() {
        let listing = chord_listing(&Assignment::new());
        assert_eq!(listing.len(), 21);
        assert_eq!(listing[0].chord, "Supernal Tree-Triad");
        assert_eq!(listing[3].chord, "Keter (Below)");
        assert!(listing.iter().all(|c| c.spice == Consonance::Empty));
    }

    #[test]
    fn test_missing_paths_and_assignment_keys() {
        let world = WorldName::Assiah.world();
        let mut a = Assignment::new();
        for p in path_numbers() {
            a.set(p, world.spell(PitchClass::G));
        }
        let mut system = MusicalSystem::from_assignment(&world, &a, "x".into());
        assert!(system.missing_paths().is_empty());
        system.assignments.remove("17");
        assert_eq!(system.missing_paths(), vec![17]);
        system.assignments.insert("40".into(), note("C"));
        assert!(matches!(system.assignment(), Err(Error::InvalidSystem(_))));
    }

    #[test]
    fn test_verify_rejects_monotone_system() {
        let world = WorldName::Assiah.world();
        let mut a = Assignment::new();
        for p in path_numbers() {
            a.set(p, note("G"));
        }
        let system = MusicalSystem::from_assignment(&world, &a, "flat".into());
        assert!(matches!(system.verify(&world, 6), Err(Error::InvalidSystem(_))));
    }

    #[test]
    fn test_iso_date() {
        assert_eq!(iso_date(UNIX_EPOCH), "1970-01-01");
        let new_year_2024 = UNIX_EPOCH + Duration::from_secs(19_723 * 86_400);
        assert_eq!(iso_date(new_year_2024), "2024-01-01");
        let leap_day = UNIX_EPOCH + Duration::from_secs(19_782 * 86_400 + 3_600);
        assert_eq!(iso_date(leap_day), "2024-02-29");
    }

    #[test]
    fn test_store_preserves_foreign_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("systems.json");
        let foreign = r#"{
  "Paul_Foster_Case": {
    "world": "assiah",
    "assignments": {
      "32": "C",
      "11": "E"
    }
  }
}"#;
        std::fs::write(&path, foreign).unwrap();

        let store = SystemStore::new(&path);
        let world = WorldName::Yetzirah.world();
        let mut a = Assignment::new();
        for p in path_numbers() {
            a.set(p, note("C"));
        }
        let system = MusicalSystem::from_assignment(&world, &a, "Hybrid_Yetzirah_2024-01-01".into());
        store.append(&system).unwrap();

        let names = store.names().unwrap();
        assert_eq!(names, vec!["Paul_Foster_Case", "Hybrid_Yetzirah_2024-01-01"]);
        let raw = store.load_raw().unwrap();
        assert_eq!(raw["Paul_Foster_Case"]["assignments"]["11"], "E");

        // The existing entry is rewritten byte for byte, keys in file order.
        let text = std::fs::read_to_string(&path).unwrap();
        let entry = &foreign[..foreign.len() - 2];
        assert!(text.starts_with(entry), "{text}");
        let record = &raw["Hybrid_Yetzirah_2024-01-01"];
        let fields: Vec<&str> = record.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(fields[0], "world");
        assert_eq!(fields[1], "description");
        let loaded = store.get("Hybrid_Yetzirah_2024-01-01").unwrap().unwrap();
        assert_eq!(loaded, system);
    }

    #[test]
    fn test_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = SystemStore::new(dir.path().join("none.json"));
        assert!(store.names().unwrap().is_empty());
        assert!(store.get("anything").unwrap().is_none());
    }
}
