//! # Commands
//!
//! A command runs one of the host's named actions, e.g.
//! `NoteInput.Pitch?Pitch=C,OctaveValue=4`.

use crate::requests::Request;
use crate::responses::{CommandInfo, ResponseKind};
use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandParameter {
    pub name: String,
    pub value: String,
}

impl CommandParameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for CommandParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// A host command with its parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    name: String,
    parameters: Vec<CommandParameter>,
    info: Option<CommandInfo>,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            info: None,
        }
    }

    /// Build from a catalog entry, keeping the entry for later inspection.
    #[must_use]
    pub fn from_info(info: &CommandInfo) -> Self {
        Self {
            name: info.name.clone(),
            parameters: Vec::new(),
            info: Some(info.clone()),
        }
    }

    #[must_use]
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_parameter(CommandParameter::new(name, value));
        self
    }

    /// Add a parameter. A parameter with the same name is replaced.
    pub fn add_parameter(&mut self, parameter: CommandParameter) {
        match self.parameters.iter_mut().find(|p| p.name == parameter.name) {
            Some(existing) => *existing = parameter,
            None => self.parameters.push(parameter),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn parameters(&self) -> &[CommandParameter] {
        &self.parameters
    }

    #[must_use]
    pub fn info(&self) -> Option<&CommandInfo> {
        self.info.as_ref()
    }

    /// `Name?P1=V1,P2=V2`
    #[must_use]
    pub fn command_string(&self) -> String {
        let parameters: Vec<String> = self.parameters.iter().map(ToString::to_string).collect();
        format!("{}?{}", self.name, parameters.join(","))
    }
}

impl Request for Command {
    fn message_id(&self) -> &'static str {
        "command"
    }

    fn response_kind(&self) -> ResponseKind {
        ResponseKind::Code
    }

    fn fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("command".into(), Value::from(self.command_string()));
        fields
    }
}
