use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Category of a discovered UI feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureType {
    Button,
    Input,
    Menu,
    Dropdown,
    Tab,
    Panel,
    Chart,
    Modal,
    Table,
    Other,
}

impl FeatureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureType::Button => "button",
            FeatureType::Input => "input",
            FeatureType::Menu => "menu",
            FeatureType::Dropdown => "dropdown",
            FeatureType::Tab => "tab",
            FeatureType::Panel => "panel",
            FeatureType::Chart => "chart",
            FeatureType::Modal => "modal",
            FeatureType::Table => "table",
            FeatureType::Other => "other",
        }
    }
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Interaction capability token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Click,
    Fill,
    Clear,
    Focus,
    Blur,
    Hover,
    Select,
    Check,
    Uncheck,
    Screenshot,
    Press,
    Drag,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Click => "click",
            Action::Fill => "fill",
            Action::Clear => "clear",
            Action::Focus => "focus",
            Action::Blur => "blur",
            Action::Hover => "hover",
            Action::Select => "select",
            Action::Check => "check",
            Action::Uncheck => "uncheck",
            Action::Screenshot => "screenshot",
            Action::Press => "press",
            Action::Drag => "drag",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Insertion-ordered set of actions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Action>", into = "Vec<Action>")]
pub struct ActionSet(Vec<Action>);

impl ActionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an action, returns false if it was already present
    pub fn insert(&mut self, action: Action) -> bool {
        if self.0.contains(&action) {
            return false;
        }
        self.0.push(action);
        true
    }

    pub fn contains(&self, action: Action) -> bool {
        self.0.contains(&action)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Action> + '_ {
        self.0.iter().copied()
    }
}

impl From<Vec<Action>> for ActionSet {
    fn from(actions: Vec<Action>) -> Self {
        actions.into_iter().collect()
    }
}

impl From<ActionSet> for Vec<Action> {
    fn from(set: ActionSet) -> Self {
        set.0
    }
}

impl FromIterator<Action> for ActionSet {
    fn from_iter<I: IntoIterator<Item = Action>>(iter: I) -> Self {
        let mut set = ActionSet::new();
        for action in iter {
            set.insert(action);
        }
        set
    }
}

/// A discovered UI element with its inferred capabilities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredFeature {
    pub name: String,
    #[serde(rename = "type")]
    pub feature_type: FeatureType,
    pub selector: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_type: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub actions: ActionSet,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DiscoveredFeature>,
}

impl DiscoveredFeature {
    pub fn new(name: impl Into<String>, feature_type: FeatureType, selector: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            feature_type,
            selector: selector.into(),
            text: None,
            input_type: None,
            attributes: BTreeMap::new(),
            actions: ActionSet::new(),
            children: Vec::new(),
        }
    }

    pub fn with_text(mut self, text: Option<String>) -> Self {
        self.text = text;
        self
    }

    pub fn with_input_type(mut self, input_type: impl Into<String>) -> Self {
        self.input_type = Some(input_type.into());
        self
    }

    pub fn with_attribute(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    /// Add the attribute only when a value is present
    pub fn with_optional_attribute(mut self, name: &str, value: Option<String>) -> Self {
        if let Some(value) = value {
            self.attributes.insert(name.to_string(), value);
        }
        self
    }

    pub fn with_actions(mut self, actions: impl IntoIterator<Item = Action>) -> Self {
        for action in actions {
            self.actions.insert(action);
        }
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// A feature survives aggregation only with a non-blank name and selector
    pub fn is_valid(&self) -> bool {
        !self.name.trim().is_empty() && !self.selector.trim().is_empty()
    }
}

/// Scanner output category.
///
/// Declaration order is the merge precedence: when two categories claim the
/// same selector, the earlier one wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    Buttons,
    Inputs,
    Menus,
    Panels,
    Charts,
    Modals,
    Tables,
    CustomComponents,
    Dropdowns,
    Tabs,
}

impl Category {
    pub const PRECEDENCE: [Category; 10] = [
        Category::Buttons,
        Category::Inputs,
        Category::Menus,
        Category::Panels,
        Category::Charts,
        Category::Modals,
        Category::Tables,
        Category::CustomComponents,
        Category::Dropdowns,
        Category::Tabs,
    ];

    pub fn feature_type(&self) -> FeatureType {
        match self {
            Category::Buttons => FeatureType::Button,
            Category::Inputs => FeatureType::Input,
            Category::Menus => FeatureType::Menu,
            Category::Panels => FeatureType::Panel,
            Category::Charts => FeatureType::Chart,
            Category::Modals => FeatureType::Modal,
            Category::Tables => FeatureType::Table,
            Category::CustomComponents => FeatureType::Other,
            Category::Dropdowns => FeatureType::Dropdown,
            Category::Tabs => FeatureType::Tab,
        }
    }
}

/// Features found by one scanner for one category
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryBatch {
    pub category: Category,
    pub features: Vec<DiscoveredFeature>,
}

impl CategoryBatch {
    pub fn new(category: Category, features: Vec<DiscoveredFeature>) -> Self {
        Self { category, features }
    }
}

/// Feature found by the essentials pass, with a selector-stability score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedFeature {
    #[serde(flatten)]
    pub feature: DiscoveredFeature,
    pub confidence: f64,
}
