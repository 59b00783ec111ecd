//! # Wire Enums
//!
//! Every enum the host puts on the wire is a `k`-prefixed string such as
//! `kWriteMode`. Decoding is tolerant: unknown names, blank strings, `null`,
//! and out-of-range numbers all collapse to the enum's default variant so a
//! newer host never breaks status decoding.

use crate::error::TypesError;
use serde_json::Value;
use tracing::debug;

/// Declares a wire enum with case-insensitive parsing, index lookup and
/// tolerant serde support. The variant marked `#[default]` is the fallback.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident = $wire:literal $(| $alias:literal)*
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Every variant, in wire discriminant order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Canonical wire spelling.
            #[must_use]
            pub fn wire_name(self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }

            /// Parse a wire name (case-insensitive, aliases accepted) or a
            /// numeric discriminant written as a string.
            #[must_use]
            pub fn from_wire(value: &str) -> Option<Self> {
                let value = value.trim();
                $(
                    if value.eq_ignore_ascii_case($wire)
                        $(|| value.eq_ignore_ascii_case($alias))*
                    {
                        return Some($name::$variant);
                    }
                )+
                value.parse::<i64>().ok().and_then(Self::from_index)
            }

            /// Look up a variant by numeric discriminant.
            #[must_use]
            pub fn from_index(index: i64) -> Option<Self> {
                usize::try_from(index)
                    .ok()
                    .and_then(|i| Self::ALL.get(i).copied())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.wire_name())
            }
        }

        impl std::str::FromStr for $name {
            type Err = TypesError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_wire(s).ok_or_else(|| TypesError::UnknownEnumValue {
                    kind: stringify!($name),
                    value: s.to_string(),
                })
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.wire_name())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let value = <Value as serde::Deserialize>::deserialize(deserializer)?;
                Ok(decode_tolerant(&value, stringify!($name), Self::from_wire, Self::from_index)
                    .unwrap_or_default())
            }
        }
    };
}

/// Shared fallback logic for every wire enum.
fn decode_tolerant<T>(
    value: &Value,
    kind: &'static str,
    by_name: fn(&str) -> Option<T>,
    by_index: fn(i64) -> Option<T>,
) -> Option<T> {
    match value {
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => {
            let parsed = by_name(s);
            if parsed.is_none() {
                debug!(kind, value = %s, "Unknown enum name, using default");
            }
            parsed
        }
        Value::Number(n) => {
            let parsed = n.as_i64().and_then(by_index);
            if parsed.is_none() {
                debug!(kind, value = %n, "Unknown enum number, using default");
            }
            parsed
        }
        _ => None,
    }
}

wire_enum! {
    /// Accidental type used by note input commands.
    pub enum Accidental {
        #[default]
        None = "None",
        Natural = "kNatural",
        Sharp = "kSharp",
        DoubleSharp = "kDoubleSharp",
        TripleSharp = "kTripleSharp",
        Flat = "kFlat",
        DoubleFlat = "kDoubleFlat",
        TripleFlat = "kTripleFlat",
    }
}

wire_enum! {
    pub enum ActivePlayModeTool {
        #[default]
        Undefined = "Undefined",
        ObjectSelection = "kObjectSelection",
        Erase = "kErase",
        Draw = "kDraw",
        Line = "kLine",
        DrumStick = "kDrumStick",
    }
}

wire_enum! {
    pub enum DragHandlesViewState {
        #[default]
        Undefined = "Undefined",
        Selected = "kSelected",
        All = "kAll",
    }
}

wire_enum! {
    pub enum FilterBehaviour {
        #[default]
        Undefined = "Undefined",
        Select = "kSelect",
        Deselect = "kDeselect",
    }
}

wire_enum! {
    /// Symbolic group of layouts for `setoptions`.
    pub enum LayoutIds {
        #[default]
        All = "kAll",
        AllFullScoreLayouts = "kAllFullScoreLayouts",
        AllPartLayouts = "kAllPartLayouts",
        AllCustomScoreLayouts = "kAllCustomScoreLayouts",
    }
}

wire_enum! {
    /// Symbolic group of flows for `setoptions`.
    pub enum FlowIds {
        #[default]
        All = "kAll",
    }
}

wire_enum! {
    pub enum LayoutType {
        #[default]
        All = "kAll",
        FullScoreLayout = "kFullScoreLayout",
        PartLayout = "kPartLayout",
        CustomScoreLayout = "kCustomScoreLayout",
    }
}

wire_enum! {
    pub enum NoteColoursType {
        #[default]
        Undefined = "Undefined",
        None = "kNone",
        ColourVoices = "kColourVoices",
        ColourNotesOutOfRange = "kColourNotesOutOfRange",
    }
}

wire_enum! {
    pub enum NoteInputMode {
        #[default]
        Undefined = "Undefined",
        Insert = "kInsert",
        Overwrite = "kOverwrite",
        ChordMerge = "kChordMerge",
    }
}

wire_enum! {
    pub enum NoteInputPitchMode {
        #[default]
        Undefined = "Undefined",
        WrittenPitch = "kWrittenPitch",
        SoundingPitch = "kSoundingPitch",
    }
}

wire_enum! {
    /// Which option family a `getoptions`/`setoptions` call targets.
    pub enum OptionsType {
        #[default]
        Undefined = "Undefined",
        Layout = "kLayout",
        Engraving = "kEngraving",
        Notation = "kNotation",
    }
}

wire_enum! {
    pub enum PagePositionPolicy {
        #[default]
        Undefined = "Undefined",
        SingleHorizontal = "kSingleHorizontal",
        SingleVertical = "kSingleVertical",
        SpreadHorizontal = "kSpreadHorizontal",
        SpreadVertical = "kSpreadVertical",
        GalleyView = "kGalleyView",
    }
}

wire_enum! {
    /// Note input grid. The host reports British names; American names
    /// are accepted as aliases.
    pub enum RhythmicGridResolution {
        #[default]
        Undefined = "Undefined",
        Semibreve = "kSemibreve" | "Whole",
        DottedMinim = "kDottedMinim" | "DottedHalf",
        Minim = "kMinim" | "Half",
        DottedCrotchet = "kDottedCrotchet" | "DottedQuarter",
        Crotchet = "kCrotchet" | "Quarter",
        DottedQuaver = "kDottedQuaver" | "DottedEighth",
        Quaver = "kQuaver" | "Eighth",
        DottedSemiquaver = "kDottedSemiquaver" | "DottedSixteenth",
        Semiquaver = "kSemiquaver" | "Sixteenth",
        Demisemiquaver = "kDemisemiquaver" | "ThirtySecond",
    }
}

wire_enum! {
    pub enum ToolType {
        #[default]
        Undefined = "Undefined",
        MarqueeSelect = "kMarqueeSelect",
        Hand = "kHand",
    }
}

wire_enum! {
    /// Top-level mode of the host window.
    pub enum WindowMode {
        #[default]
        Undefined = "Undefined",
        SetupMode = "kSetupMode",
        WriteMode = "kWriteMode",
        EngraveMode = "kEngraveMode",
        PlayMode = "kPlayMode",
        PrintMode = "kPrintMode",
    }
}
