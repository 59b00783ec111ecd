//! # Notes
//!
//! Pitch arithmetic for building note-input commands. Octaves follow the
//! scientific convention where MIDI 60 is C4.

use crate::commands::Command;
use crate::enums::Accidental;
use crate::error::NoteError;
use std::fmt;
use std::ops::{Add, Sub};

const SHARP_NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];
const FLAT_NAMES: [&str; 12] = ["C", "Db", "D", "Eb", "E", "F", "Gb", "G", "Ab", "A", "Bb", "B"];

pub const MIN_MIDI: i32 = 0;
pub const MAX_MIDI: i32 = 127;
pub const MIN_OCTAVE: i32 = -1;
pub const MAX_OCTAVE: i32 = 9;

/// How black keys are spelled when a note is built from a MIDI number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Spelling {
    #[default]
    Sharps,
    Flats,
}

impl Spelling {
    fn names(self) -> &'static [&'static str; 12] {
        match self {
            Self::Sharps => &SHARP_NAMES,
            Self::Flats => &FLAT_NAMES,
        }
    }

    fn flipped(self) -> Self {
        match self {
            Self::Sharps => Self::Flats,
            Self::Flats => Self::Sharps,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    midi: i32,
    pitch: char,
    accidental: String,
    octave: i32,
    spelling: Spelling,
}

impl Note {
    /// Build from a MIDI number in `0..=127`.
    pub fn from_midi(midi: i32, spelling: Spelling) -> Result<Self, NoteError> {
        if !(MIN_MIDI..=MAX_MIDI).contains(&midi) {
            return Err(NoteError::MidiOutOfRange(midi));
        }
        let name = spelling.names()[midi.rem_euclid(12) as usize];
        let mut chars = name.chars();
        let pitch = chars.next().unwrap_or('C');
        Ok(Self {
            midi,
            pitch,
            accidental: chars.as_str().to_string(),
            octave: (midi - 12).div_euclid(12),
            spelling,
        })
    }

    /// Build from a pitch name such as `C`, `F#`, `Bb` or `Gx` and an octave
    /// in `-1..=9`. `0` as the accidental means an explicit natural.
    pub fn from_name(name: &str, octave: i32) -> Result<Self, NoteError> {
        if !(MIN_OCTAVE..=MAX_OCTAVE).contains(&octave) {
            return Err(NoteError::OctaveOutOfRange(octave));
        }
        let trimmed = name.trim();
        let mut chars = trimmed.chars();
        let pitch = chars
            .next()
            .map(|c| c.to_ascii_uppercase())
            .ok_or_else(|| NoteError::InvalidPitch(name.to_string()))?;
        let letter_offset = match pitch {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            _ => return Err(NoteError::InvalidPitch(name.to_string())),
        };
        let accidental = chars.as_str().to_ascii_lowercase();
        let shift = accidental_shift(&accidental)
            .ok_or_else(|| NoteError::InvalidPitch(name.to_string()))?;

        let midi = octave * 12 + 12 + letter_offset + shift;
        if !(MIN_MIDI..=MAX_MIDI).contains(&midi) {
            return Err(NoteError::MidiOutOfRange(midi));
        }
        let spelling = if accidental.starts_with('b') {
            Spelling::Flats
        } else {
            Spelling::Sharps
        };
        Ok(Self {
            midi,
            pitch,
            accidental,
            octave,
            spelling,
        })
    }

    #[must_use]
    pub fn midi(&self) -> i32 {
        self.midi
    }

    /// Letter name, `A` to `G`.
    #[must_use]
    pub fn pitch(&self) -> char {
        self.pitch
    }

    /// Accidental suffix as written: `""`, `#`, `b`, `x`, ...
    #[must_use]
    pub fn accidental(&self) -> &str {
        &self.accidental
    }

    #[must_use]
    pub fn octave(&self) -> i32 {
        self.octave
    }

    #[must_use]
    pub fn spelling(&self) -> Spelling {
        self.spelling
    }

    /// Key number on an 88-key piano, or -1 when off the keyboard.
    #[must_use]
    pub fn piano_key(&self) -> i32 {
        let key = self.midi - 20;
        if (1..=88).contains(&key) {
            key
        } else {
            -1
        }
    }

    /// Key number on a 61-key organ manual, or -1 when off the manual.
    #[must_use]
    pub fn organ_key(&self) -> i32 {
        let key = self.midi - 35;
        if (1..=61).contains(&key) {
            key
        } else {
            -1
        }
    }

    /// Equal-tempered frequency in Hz (A4 = 440), rounded to 2 decimals.
    #[must_use]
    pub fn frequency(&self) -> f64 {
        let hz = 440.0 * 2f64.powf(f64::from(self.midi - 69) / 12.0);
        (hz * 100.0).round() / 100.0
    }

    /// Accidental type understood by `NoteInput.SetAccidental`, if any.
    #[must_use]
    pub fn accidental_type(&self) -> Option<Accidental> {
        match self.accidental.as_str() {
            "0" => Some(Accidental::Natural),
            "#" => Some(Accidental::Sharp),
            "x" => Some(Accidental::DoubleSharp),
            "#x" => Some(Accidental::TripleSharp),
            "b" => Some(Accidental::Flat),
            "bb" => Some(Accidental::DoubleFlat),
            "bbb" => Some(Accidental::TripleFlat),
            _ => None,
        }
    }

    /// Same key, spelled the other way (`C#` <-> `Db`).
    pub fn to_enharmonic(&self) -> Result<Self, NoteError> {
        Self::from_midi(self.midi, self.spelling.flipped())
    }

    /// Transpose by `semitones`, keeping the spelling.
    pub fn transpose(&self, semitones: i32) -> Result<Self, NoteError> {
        Self::from_midi(self.midi + semitones, self.spelling)
    }

    /// Commands that enter this note in note input mode.
    #[must_use]
    pub fn note_commands(&self) -> Vec<Command> {
        let mut commands = Vec::with_capacity(2);
        if let Some(accidental) = self.accidental_type() {
            commands.push(
                Command::new("NoteInput.SetAccidental").with_parameter("Type", accidental.wire_name()),
            );
        }
        commands.push(
            Command::new("NoteInput.Pitch")
                .with_parameter("Pitch", self.pitch.to_string())
                .with_parameter("OctaveValue", self.octave.to_string()),
        );
        commands
    }
}

fn accidental_shift(accidental: &str) -> Option<i32> {
    match accidental {
        "" | "0" => Some(0),
        "#" => Some(1),
        "x" => Some(2),
        "#x" => Some(3),
        "b" => Some(-1),
        "bb" => Some(-2),
        "bbb" => Some(-3),
        _ => None,
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.pitch, self.accidental, self.octave)
    }
}

impl Add<i32> for &Note {
    type Output = Result<Note, NoteError>;

    fn add(self, semitones: i32) -> Self::Output {
        self.transpose(semitones)
    }
}

impl Sub<i32> for &Note {
    type Output = Result<Note, NoteError>;

    fn sub(self, semitones: i32) -> Self::Output {
        self.transpose(-semitones)
    }
}
