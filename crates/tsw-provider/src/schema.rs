//! Attribute declarations published to the orchestrator.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    String,
    Int64,
    StringList,
    Int64List,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    pub name: &'static str,
    pub kind: AttributeKind,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    /// Changing this attribute replaces the entity instead of updating it.
    pub requires_replace: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'static str>,
}

impl Attribute {
    fn new(name: &'static str, kind: AttributeKind) -> Self {
        Self {
            name,
            kind,
            required: false,
            optional: false,
            computed: false,
            sensitive: false,
            requires_replace: false,
            description: None,
        }
    }

    pub fn required(name: &'static str, kind: AttributeKind) -> Self {
        Self {
            required: true,
            ..Self::new(name, kind)
        }
    }

    pub fn optional(name: &'static str, kind: AttributeKind) -> Self {
        Self {
            optional: true,
            ..Self::new(name, kind)
        }
    }

    pub fn computed(name: &'static str, kind: AttributeKind) -> Self {
        Self {
            computed: true,
            ..Self::new(name, kind)
        }
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn requires_replace(mut self) -> Self {
        self.requires_replace = true;
        self
    }

    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = Some(description);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schema {
    pub description: &'static str,
    pub attributes: Vec<Attribute>,
}

impl Schema {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Replacement-triggering attributes whose value differs between
    /// `prior` state and `planned` configuration.
    pub fn replacement_fields(
        &self,
        prior: &serde_json::Value,
        planned: &serde_json::Value,
    ) -> Vec<&'static str> {
        self.attributes
            .iter()
            .filter(|a| a.requires_replace)
            .filter(|a| prior.get(a.name) != planned.get(a.name))
            .map(|a| a.name)
            .collect()
    }
}

/// Provider-level settings: `endpoint` and `api_token`.
pub fn provider_schema() -> Schema {
    Schema {
        description: "TeraSwitch provider configuration.",
        attributes: vec![
            Attribute::optional("endpoint", AttributeKind::String)
                .describe("TeraSwitch API URL"),
            Attribute::required("api_token", AttributeKind::String)
                .sensitive()
                .describe("TeraSwitch REST API token"),
        ],
    }
}
