use crate::colors::Color;
use crate::command::{Command, Kind};
use crate::time::TimeDuration;
use crate::types::{ProgramError, SequencerConfig};
use heapless::Vec;

/// A validated, ordered list of hub commands.
///
/// Programs are built once per request, consumed by one run and dropped.
/// Every color in a program is already resolved, so a run can never fail on
/// an unknown color name.
///
/// # Type Parameters
/// * `N` - Maximum number of commands this program can hold
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandProgram<const N: usize> {
    commands: Vec<Command, N>,
}

impl<const N: usize> CommandProgram<N> {
    /// Creates a new program builder.
    pub fn builder() -> ProgramBuilder<N> {
        ProgramBuilder::new()
    }

    /// Parses the client wire form.
    ///
    /// `"motor"` entries need an integer value and `"color"` entries a color
    /// name. Entries with any other `type` are dropped.
    ///
    /// # Errors
    /// * `InvalidValue` - A value has the wrong type or does not fit an `i32`
    /// * `UnknownColor` - A color name is not in the table
    /// * `CapacityExceeded` - More than `N` commands remain after filtering
    pub fn from_raw(raw: &[RawCommand]) -> Result<Self, ProgramError> {
        let mut builder = ProgramBuilder::new();

        for (index, entry) in raw.iter().enumerate() {
            let command = match (entry.kind.as_str(), &entry.value) {
                ("motor", RawValue::Int(units)) => {
                    let units =
                        i32::try_from(*units).map_err(|_| ProgramError::InvalidValue { index })?;
                    Command::Rotate(units)
                }
                ("color", RawValue::Text(name)) => Color::from_name(name.as_str())
                    .map(Command::SetColor)
                    .map_err(|_| ProgramError::UnknownColor { index })?,
                ("motor", _) | ("color", _) => {
                    return Err(ProgramError::InvalidValue { index });
                }
                (other, _) => {
                    debug!("dropping command {} with unknown type {:?}", index, other);
                    continue;
                }
            };
            builder = builder.command(command)?;
        }

        Ok(builder.build())
    }

    /// Returns the number of commands in this program.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Returns the command at the given index.
    pub fn get(&self, index: usize) -> Option<Command> {
        self.commands.get(index).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Command> + '_ {
        self.commands.iter()
    }

    pub fn as_slice(&self) -> &[Command] {
        &self.commands
    }

    /// Kinds of the commands, in order.
    pub fn kinds(&self) -> impl Iterator<Item = Kind> + '_ {
        self.commands.iter().map(Command::kind)
    }

    /// Number of kind changes between consecutive commands.
    ///
    /// Each one costs a stop write and a settle delay during a run.
    pub fn transition_count(&self) -> usize {
        self.commands
            .windows(2)
            .filter(|pair| pair[0].kind() != pair[1].kind())
            .count()
    }

    /// Total time a run of this program spends suspended.
    ///
    /// Write latency is not included.
    pub fn estimated_duration<D: TimeDuration>(&self, config: &SequencerConfig<D>) -> D {
        let holds: u64 = self
            .commands
            .iter()
            .map(|command| command.hold(config.color_dwell).as_millis())
            .sum();
        let settles = config.settle_delay.as_millis() * self.transition_count() as u64;
        D::from_millis(holds + settles)
    }
}

impl<const N: usize> Default for CommandProgram<N> {
    fn default() -> Self {
        Self { commands: Vec::new() }
    }
}

/// Builder for constructing command programs.
#[derive(Debug)]
pub struct ProgramBuilder<const N: usize> {
    commands: Vec<Command, N>,
}

impl<const N: usize> ProgramBuilder<N> {
    /// Creates a new empty program builder.
    pub fn new() -> Self {
        Self { commands: Vec::new() }
    }

    /// Appends a command.
    ///
    /// # Errors
    /// Returns `CapacityExceeded` if the program already holds `N` commands.
    pub fn command(mut self, command: Command) -> Result<Self, ProgramError> {
        self.commands
            .push(command)
            .map_err(|_| ProgramError::CapacityExceeded)?;
        Ok(self)
    }

    /// Appends a rotation of `units`; negative units turn the other way.
    pub fn rotate(self, units: i32) -> Result<Self, ProgramError> {
        self.command(Command::Rotate(units))
    }

    /// Appends a color change.
    pub fn color(self, color: Color) -> Result<Self, ProgramError> {
        self.command(Command::SetColor(color))
    }

    /// Appends a color change by client-facing name.
    ///
    /// # Errors
    /// Returns `UnknownColor` with the position the command would have taken.
    pub fn color_named(self, name: &str) -> Result<Self, ProgramError> {
        let index = self.commands.len();
        let color = Color::from_name(name).map_err(|_| ProgramError::UnknownColor { index })?;
        self.color(color)
    }

    /// Finishes the program. An empty program is valid: its run only stops the motor.
    pub fn build(self) -> CommandProgram<N> {
        CommandProgram {
            commands: self.commands,
        }
    }
}

impl<const N: usize> Default for ProgramBuilder<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Longest string kept from a raw command.
///
/// Longer strings are cut at this length. Every command type and color name
/// is far shorter, so a cut string never matches one.
pub const RAW_TEXT_CAPACITY: usize = 16;

/// String field of a [`RawCommand`], stored inline.
pub type RawText = heapless::String<RAW_TEXT_CAPACITY>;

/// Copies `text` into a [`RawText`], cutting it at [`RAW_TEXT_CAPACITY`] bytes.
pub fn raw_text(text: &str) -> RawText {
    let mut out = RawText::new();
    for c in text.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

/// Value of a [`RawCommand`]: an integer for motor commands, a name for colors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    Int(i64),
    Text(RawText),
    /// Any other value: a float, a bool, null, an array, an object, or an
    /// integer outside `i64`.
    Other,
}

impl RawValue {
    pub fn text(text: &str) -> Self {
        RawValue::Text(raw_text(text))
    }
}

/// One command as submitted by a client, e.g. `{"type": "motor", "value": 2}`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
pub struct RawCommand {
    #[cfg_attr(
        feature = "serde",
        serde(rename = "type", deserialize_with = "de::raw_text")
    )]
    pub kind: RawText,
    pub value: RawValue,
}

impl RawCommand {
    pub fn new(kind: &str, value: RawValue) -> Self {
        Self {
            kind: raw_text(kind),
            value,
        }
    }

    pub fn motor(units: i64) -> Self {
        Self::new("motor", RawValue::Int(units))
    }

    pub fn color(name: &str) -> Self {
        Self::new("color", RawValue::text(name))
    }
}

/// Allocation-free deserialization of the raw wire form.
#[cfg(feature = "serde")]
mod de {
    use super::{RawText, RawValue, raw_text as copy_text};
    use core::fmt;
    use serde::de::{self, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};

    struct TextVisitor;

    impl<'de> Visitor<'de> for TextVisitor {
        type Value = RawText;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a string")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<RawText, E> {
            Ok(copy_text(v))
        }
    }

    pub(super) fn raw_text<'de, D>(deserializer: D) -> Result<RawText, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_str(TextVisitor)
    }

    struct ValueVisitor;

    impl<'de> Visitor<'de> for ValueVisitor {
        type Value = RawValue;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a command value")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<RawValue, E> {
            Ok(RawValue::Int(v))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<RawValue, E> {
            Ok(i64::try_from(v).map_or(RawValue::Other, RawValue::Int))
        }

        fn visit_f64<E: de::Error>(self, _: f64) -> Result<RawValue, E> {
            Ok(RawValue::Other)
        }

        fn visit_bool<E: de::Error>(self, _: bool) -> Result<RawValue, E> {
            Ok(RawValue::Other)
        }

        fn visit_unit<E: de::Error>(self) -> Result<RawValue, E> {
            Ok(RawValue::Other)
        }

        fn visit_none<E: de::Error>(self) -> Result<RawValue, E> {
            Ok(RawValue::Other)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<RawValue, E> {
            Ok(RawValue::Text(copy_text(v)))
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<RawValue, A::Error> {
            while seq.next_element::<IgnoredAny>()?.is_some() {}
            Ok(RawValue::Other)
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<RawValue, A::Error> {
            while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
            Ok(RawValue::Other)
        }
    }

    impl<'de> serde::Deserialize<'de> for RawValue {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            deserializer.deserialize_any(ValueVisitor)
        }
    }
}
