//! Task domain model

use serde::{Deserialize, Serialize};

/// Value of a task parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    String(String),
    Array(Vec<String>),
}

impl ParamValue {
    /// The string value, if this is not an array
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(s) => Some(s),
            ParamValue::Array(_) => None,
        }
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::String(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::String(value.to_string())
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(value: Vec<String>) -> Self {
        ParamValue::Array(value)
    }
}

/// A named task parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub value: ParamValue,
}

/// Kind of task a reference points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TaskKind {
    /// A task in the pipeline's namespace
    #[default]
    Task,
    ClusterTask,
}

/// Reference to the task definition a pipeline task runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRef {
    pub name: String,

    #[serde(default)]
    pub kind: TaskKind,
}

impl TaskRef {
    /// Reference a namespaced task
    pub fn namespaced(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TaskKind::Task,
        }
    }
}

/// A named unit of work inside a pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique within the pipeline
    pub name: String,

    pub task_ref: TaskRef,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Param>,
}

impl Task {
    pub fn new(name: impl Into<String>, task_ref: TaskRef) -> Self {
        Self {
            name: name.into(),
            task_ref,
            params: Vec::new(),
        }
    }

    /// Add a parameter, replacing any previous value with the same name
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.params.iter_mut().find(|p| p.name == name) {
            Some(param) => param.value = value,
            None => self.params.push(Param { name, value }),
        }
        self
    }

    /// Look up a parameter value by name
    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params.iter().find(|p| p.name == name).map(|p| &p.value)
    }
}
