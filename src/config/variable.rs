use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum VariableType {
    #[default]
    String,
    #[serde(alias = "bool")]
    Boolean,
    #[serde(alias = "int")]
    Integer,
    #[serde(alias = "select")]
    Choice,
}

impl std::fmt::Display for VariableType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            VariableType::String => "string",
            VariableType::Boolean => "boolean",
            VariableType::Integer => "integer",
            VariableType::Choice => "choice",
        };
        f.write_str(name)
    }
}

/// One `[[variables]]` entry of a partial manifest.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct VariableSpec {
    pub name: String,

    #[serde(rename = "type", default)]
    pub var_type: VariableType,

    #[serde(default)]
    pub required: bool,

    /// May reference other variables as `{{OTHER}}`.
    #[serde(default, deserialize_with = "deserialize_default")]
    pub default: Option<String>,

    pub validation: Option<String>,
    pub validation_message: Option<String>,

    #[serde(default)]
    pub choices: Vec<String>,

    pub description: Option<String>,
    pub prompt: Option<String>,
}

impl VariableSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_type(mut self, var_type: VariableType) -> Self {
        self.var_type = var_type;
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_validation(mut self, pattern: impl Into<String>) -> Self {
        self.validation = Some(pattern.into());
        self
    }

    pub fn with_choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Manifest authors write `default = true` or `default = 8080`; everything is kept as a string.
fn deserialize_default<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawDefault {
        Text(String),
        Flag(bool),
        Number(i64),
    }

    let raw = Option::<RawDefault>::deserialize(deserializer)?;
    Ok(raw.map(|value| match value {
        RawDefault::Text(s) => s,
        RawDefault::Flag(b) => b.to_string(),
        RawDefault::Number(n) => n.to_string(),
    }))
}
