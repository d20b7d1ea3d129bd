//! # Musical Tuning Module
//!
//! Maps a measured frequency to the nearest entry of a note table.
//!
//! ## Features
//! - Standard guitar-range table, E2 (82.41 Hz) to E5 (659.25 Hz)
//! - Midpoint bisection quantizer that saturates at both ends
//! - Equal temperament tables for alternate instruments
//! - Cent deviation calculations

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{TunerError, TunerResult};

/// A reading within this many Hz of the target note counts as in tune.
pub const IN_TUNE_TOLERANCE_HZ: f64 = 1.0;

/// Represents a single musical note with its name and frequency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Note name (e.g., "A4", "C#3/Db3")
    pub name: String,
    /// Frequency in Hz
    pub frequency: f64,
}

impl Note {
    pub fn new(name: impl Into<String>, frequency: f64) -> Self {
        Self {
            name: name.into(),
            frequency,
        }
    }
}

/// Reference pitches of the standard table, rounded to 0.01 Hz.
const STANDARD_NOTES: [(&str, f64); 37] = [
    ("E2", 82.41),
    ("F2", 87.31),
    ("F#2/Gb2", 92.5),
    ("G2", 98.0),
    ("G#2/Ab2", 103.83),
    ("A2", 110.0),
    ("A#2/Bb2", 116.54),
    ("B2", 123.47),
    ("C3", 130.81),
    ("C#3/Db3", 138.59),
    ("D3", 146.83),
    ("D#3/Eb3", 155.56),
    ("E3", 164.81),
    ("F3", 174.61),
    ("F#3/Gb3", 185.0),
    ("G3", 196.0),
    ("G#3/Ab3", 207.65),
    ("A3", 220.0),
    ("A#3/Bb3", 233.08),
    ("B3", 246.94),
    ("C4", 261.63),
    ("C#4/Db4", 277.18),
    ("D4", 293.66),
    ("D#4/Eb4", 311.13),
    ("E4", 329.63),
    ("F4", 349.23),
    ("F#4/Gb4", 369.99),
    ("G4", 392.0),
    ("G#4/Ab4", 415.3),
    ("A4", 440.0),
    ("A#4/Bb4", 466.16),
    ("B4", 493.88),
    ("C5", 523.25),
    ("C#5/Db5", 554.37),
    ("D5", 587.33),
    ("D#5/Eb5", 622.25),
    ("E5", 659.25),
];

/// The standard table, built once on first use.
static STANDARD_TABLE: Lazy<NoteTable> = Lazy::new(|| NoteTable {
    midpoints: midpoints(&STANDARD_NOTES.map(|(_, f)| f)),
    notes: STANDARD_NOTES
        .iter()
        .map(|&(name, frequency)| Note::new(name, frequency))
        .collect(),
});

fn midpoints(frequencies: &[f64]) -> Vec<f64> {
    frequencies.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect()
}

/// An immutable, strictly increasing note table with precomputed midpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Note>", into = "Vec<Note>")]
pub struct NoteTable {
    notes: Vec<Note>,
    midpoints: Vec<f64>,
}

impl NoteTable {
    /// Builds a table from notes sorted by strictly increasing frequency.
    pub fn new(notes: Vec<Note>) -> TunerResult<Self> {
        if notes.is_empty() {
            return Err(TunerError::InvalidNoteTable("table is empty".into()));
        }
        if let Some(bad) = notes
            .iter()
            .find(|n| !(n.frequency.is_finite() && n.frequency > 0.0))
        {
            return Err(TunerError::InvalidNoteTable(format!(
                "{} has frequency {}",
                bad.name, bad.frequency
            )));
        }
        if let Some(pair) = notes.windows(2).find(|w| w[1].frequency <= w[0].frequency) {
            return Err(TunerError::InvalidNoteTable(format!(
                "{} ({} Hz) does not rise above {} ({} Hz)",
                pair[1].name, pair[1].frequency, pair[0].name, pair[0].frequency
            )));
        }
        let frequencies: Vec<f64> = notes.iter().map(|n| n.frequency).collect();
        Ok(Self {
            midpoints: midpoints(&frequencies),
            notes,
        })
    }

    /// The 37-note E2..E5 table used by default.
    pub fn standard() -> &'static NoteTable {
        &STANDARD_TABLE
    }

    /// Equal temperament table over MIDI notes `first..=last`.
    ///
    /// The formula for frequency in equal temperament is f = a4 * 2^(n/12),
    /// where n is the number of semitones away from A4 (MIDI 69).
    pub fn equal_tempered(first_midi: u8, last_midi: u8, a4_hz: f64) -> TunerResult<Self> {
        const NOTE_NAMES: [&str; 12] = [
            "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
        ];
        if first_midi > last_midi {
            return Err(TunerError::InvalidNoteTable(format!(
                "MIDI range {}..={} is empty",
                first_midi, last_midi
            )));
        }
        let notes = (first_midi..=last_midi)
            .map(|midi| {
                let frequency = a4_hz * 2.0_f64.powf((midi as f64 - 69.0) / 12.0);
                // MIDI 12 is C0; octaves change at C.
                let octave = midi as i32 / 12 - 1;
                let name = format!("{}{}", NOTE_NAMES[midi as usize % 12], octave);
                Note::new(name, frequency)
            })
            .collect();
        Self::new(notes)
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Finds a note by its label.
    pub fn get(&self, name: &str) -> Option<&Note> {
        self.notes.iter().find(|n| n.name == name)
    }

    /// Nearest note to `freq`.
    ///
    /// Bisects the midpoints between neighbouring notes. A frequency exactly
    /// on a midpoint belongs to the HIGHER note. Frequencies outside the table
    /// saturate to the lowest or highest note.
    pub fn quantize(&self, freq: f64) -> &Note {
        let index = self.midpoints.partition_point(|&m| m <= freq);
        &self.notes[index]
    }
}

impl TryFrom<Vec<Note>> for NoteTable {
    type Error = TunerError;

    fn try_from(notes: Vec<Note>) -> Result<Self, Self::Error> {
        NoteTable::new(notes)
    }
}

impl From<NoteTable> for Vec<Note> {
    fn from(table: NoteTable) -> Self {
        table.notes
    }
}

/// Calculates the deviation from a target frequency in cents.
///
/// Positive values are sharp, negative values flat; 100 cents = 1 semitone.
pub fn cents_deviation(freq: f64, target_freq: f64) -> f64 {
    1200.0 * (freq / target_freq).log2()
}

/// Whether `freq` is close enough to `target_freq` to report as in tune.
pub fn is_in_tune(freq: f64, target_freq: f64, tolerance_hz: f64) -> bool {
    (freq - target_freq).abs() <= tolerance_hz
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_standard_table_shape() {
        let table = NoteTable::standard();
        assert_eq!(table.len(), 37);
        assert_eq!(table.notes()[0], Note::new("E2", 82.41));
        assert_eq!(table.notes()[36], Note::new("E5", 659.25));
        assert!(table.notes().windows(2).all(|w| w[0].frequency < w[1].frequency));
    }

    #[test]
    fn test_quantize_is_idempotent_on_entries() {
        let table = NoteTable::standard();
        for note in table.notes() {
            let q = table.quantize(note.frequency);
            assert_eq!(q, note);
            assert_eq!((note.frequency - q.frequency).abs(), 0.0);
        }
    }

    #[test]
    fn test_midpoint_rounds_up() {
        let table = NoteTable::standard();
        // Midpoint of A2 (110) and A#2/Bb2 (116.54)
        assert_eq!(table.quantize(113.28).name, "A#2/Bb2");
        assert_eq!(table.quantize(113.26).name, "A2");
        let notes = table.notes();
        for pair in notes.windows(2) {
            let mid = (pair[0].frequency + pair[1].frequency) / 2.0;
            assert_eq!(table.quantize(mid), &pair[1]);
        }
    }

    #[test]
    fn test_saturates_at_both_ends() {
        let table = NoteTable::standard();
        assert_eq!(table.quantize(0.0).name, "E2");
        assert_eq!(table.quantize(20.0).name, "E2");
        assert_eq!(table.quantize(5000.0).name, "E5");
        assert_eq!(table.quantize(f64::INFINITY).name, "E5");
    }

    #[test]
    fn test_quantize_is_monotonic() {
        let table = NoteTable::standard();
        let mut last = 0.0;
        let mut freq = 40.0;
        while freq < 800.0 {
            let q = table.quantize(freq).frequency;
            assert!(q >= last, "quantize({}) = {} dropped below {}", freq, q, last);
            last = q;
            freq += 0.05;
        }
    }

    #[test]
    fn test_rejects_unsorted_tables() {
        let notes = vec![Note::new("A3", 220.0), Note::new("G3", 196.0)];
        assert!(matches!(NoteTable::new(notes), Err(TunerError::InvalidNoteTable(_))));
        let dup = vec![Note::new("A3", 220.0), Note::new("A3", 220.0)];
        assert!(NoteTable::new(dup).is_err());
        assert!(NoteTable::new(vec![]).is_err());
        assert!(NoteTable::new(vec![Note::new("X", f64::NAN)]).is_err());
    }

    #[test]
    fn test_single_note_table() {
        let table = NoteTable::new(vec![Note::new("A4", 440.0)]).unwrap();
        assert_eq!(table.quantize(100.0).name, "A4");
        assert_eq!(table.quantize(1000.0).name, "A4");
    }

    #[test]
    fn test_equal_tempered_matches_standard_names() {
        // E2 is MIDI 40, E5 is MIDI 76
        let table = NoteTable::equal_tempered(40, 76, 440.0).unwrap();
        assert_eq!(table.len(), 37);
        assert_eq!(table.notes()[0].name, "E2");
        assert_eq!(table.notes()[29].name, "A4");
        assert_relative_eq!(table.notes()[29].frequency, 440.0);
        for (et, std) in table.notes().iter().zip(NoteTable::standard().notes()) {
            assert!((et.frequency - std.frequency).abs() < 0.01);
        }
    }

    #[test]
    fn test_json_table_is_validated() {
        let table: NoteTable = serde_json::from_str(
            r#"[{"name": "D2", "frequency": 73.42}, {"name": "A2", "frequency": 110.0}]"#,
        )
        .unwrap();
        assert_eq!(table.quantize(80.0).name, "D2");
        let bad: Result<NoteTable, _> = serde_json::from_str(
            r#"[{"name": "A2", "frequency": 110.0}, {"name": "D2", "frequency": 73.42}]"#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn test_cents_and_tolerance() {
        assert_relative_eq!(cents_deviation(880.0, 440.0), 1200.0);
        assert_relative_eq!(cents_deviation(440.0, 440.0), 0.0);
        assert!(is_in_tune(147.8, 146.83, IN_TUNE_TOLERANCE_HZ));
        assert!(!is_in_tune(148.0, 146.83, IN_TUNE_TOLERANCE_HZ));
    }
}
