//! Connector requirement form fields

use serde::{Deserialize, Serialize};

use super::SessionError;

/// The whitelisted form fields the agent may update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormField {
    SourceApiName,
    ConnectorName,
    DocumentationUrls,
    FunctionalRequirements,
    TestList,
}

impl FormField {
    pub const ALL: [FormField; 5] = [
        Self::SourceApiName,
        Self::ConnectorName,
        Self::DocumentationUrls,
        Self::FunctionalRequirements,
        Self::TestList,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SourceApiName => "source_api_name",
            Self::ConnectorName => "connector_name",
            Self::DocumentationUrls => "documentation_urls",
            Self::FunctionalRequirements => "functional_requirements",
            Self::TestList => "test_list",
        }
    }

    /// Label used in the metadata dump
    pub fn label(&self) -> &'static str {
        match self {
            Self::SourceApiName => "Source API",
            Self::ConnectorName => "Connector Name",
            Self::DocumentationUrls => "Documentation URLs",
            Self::FunctionalRequirements => "Functional Requirements",
            Self::TestList => "Test List",
        }
    }

    /// Comma-separated list of valid names, for error messages
    pub fn valid_names() -> String {
        Self::ALL.iter().map(|f| f.as_str()).collect::<Vec<_>>().join(", ")
    }
}

impl std::fmt::Display for FormField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for FormField {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == s.trim())
            .ok_or_else(|| SessionError::UnknownField(s.to_string()))
    }
}

/// Values of the requirement form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorFields {
    #[serde(default)]
    pub source_api_name: String,
    #[serde(default)]
    pub connector_name: String,
    #[serde(default)]
    pub documentation_urls: String,
    #[serde(default)]
    pub functional_requirements: String,
    #[serde(default)]
    pub test_list: String,
}

impl ConnectorFields {
    pub fn get(&self, field: FormField) -> &str {
        match field {
            FormField::SourceApiName => &self.source_api_name,
            FormField::ConnectorName => &self.connector_name,
            FormField::DocumentationUrls => &self.documentation_urls,
            FormField::FunctionalRequirements => &self.functional_requirements,
            FormField::TestList => &self.test_list,
        }
    }

    pub fn set(&mut self, field: FormField, value: impl Into<String>) {
        let slot = match field {
            FormField::SourceApiName => &mut self.source_api_name,
            FormField::ConnectorName => &mut self.connector_name,
            FormField::DocumentationUrls => &mut self.documentation_urls,
            FormField::FunctionalRequirements => &mut self.functional_requirements,
            FormField::TestList => &mut self.test_list,
        };
        *slot = value.into();
    }

    /// Human-readable dump of the non-empty fields
    pub fn metadata_text(&self) -> String {
        let order = [
            FormField::ConnectorName,
            FormField::SourceApiName,
            FormField::DocumentationUrls,
            FormField::FunctionalRequirements,
            FormField::TestList,
        ];
        let parts: Vec<String> = order
            .iter()
            .filter(|f| !self.get(**f).is_empty())
            .map(|f| format!("{}: {}", f.label(), self.get(*f)))
            .collect();

        if parts.is_empty() {
            "No connector metadata has been configured yet.".to_string()
        } else {
            parts.join("\n")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_whitelist() {
        for field in FormField::ALL {
            assert_eq!(field.as_str().parse::<FormField>().unwrap(), field);
        }
        assert!(matches!(
            "yaml_content".parse::<FormField>(),
            Err(SessionError::UnknownField(_))
        ));
    }

    #[test]
    fn test_get_set() {
        let mut fields = ConnectorFields::default();
        fields.set(FormField::TestList, "read users");
        assert_eq!(fields.get(FormField::TestList), "read users");
        assert_eq!(fields.test_list, "read users");
    }

    #[test]
    fn test_metadata_text() {
        let mut fields = ConnectorFields::default();
        assert_eq!(fields.metadata_text(), "No connector metadata has been configured yet.");

        fields.set(FormField::ConnectorName, "source-jsonplaceholder");
        fields.set(FormField::SourceApiName, "JSONPlaceholder");
        assert_eq!(
            fields.metadata_text(),
            "Connector Name: source-jsonplaceholder\nSource API: JSONPlaceholder"
        );
    }
}
