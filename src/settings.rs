use serde::{Deserialize, Serialize};

/// Which songs the recommend page starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitialSource {
    #[default]
    All,
    Unproposed,
}

impl std::fmt::Display for InitialSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InitialSource::All => write!(f, "all"),
            InitialSource::Unproposed => write!(f, "unproposed"),
        }
    }
}

impl std::str::FromStr for InitialSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(InitialSource::All),
            "unproposed" => Ok(InitialSource::Unproposed),
            _ => Err(anyhow::anyhow!("Unknown initial source: {}", s)),
        }
    }
}

/// How many songs one recommendation proposes. Only 1 and 3 are offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DisplayCount {
    #[default]
    One,
    Three,
}

impl DisplayCount {
    pub fn get(self) -> usize {
        match self {
            DisplayCount::One => 1,
            DisplayCount::Three => 3,
        }
    }
}

impl TryFrom<u8> for DisplayCount {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(DisplayCount::One),
            3 => Ok(DisplayCount::Three),
            other => Err(format!("display count must be 1 or 3, got {other}")),
        }
    }
}

impl From<DisplayCount> for u8 {
    fn from(count: DisplayCount) -> Self {
        count.get() as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Skip songs that already appear in history
    pub prevent_duplicates: bool,
    pub initial_source: InitialSource,
    pub display_count: DisplayCount,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            prevent_duplicates: true,
            initial_source: InitialSource::All,
            display_count: DisplayCount::One,
        }
    }
}

/// A partial update; `None` fields keep their current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    pub prevent_duplicates: Option<bool>,
    pub initial_source: Option<InitialSource>,
    pub display_count: Option<DisplayCount>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        *self == SettingsPatch::default()
    }
}

impl Settings {
    pub fn merged(self, patch: SettingsPatch) -> Self {
        Self {
            prevent_duplicates: patch.prevent_duplicates.unwrap_or(self.prevent_duplicates),
            initial_source: patch.initial_source.unwrap_or(self.initial_source),
            display_count: patch.display_count.unwrap_or(self.display_count),
        }
    }
}
