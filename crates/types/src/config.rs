//! Layered widget configuration.
//!
//! The host supplies settings in two layers: typed instance properties and a
//! flat bag of declarative string attributes. [`ConfigSource::resolve`] applies
//! the precedence rules and produces an immutable [`Configuration`] snapshot.
//! Callers resolve again for every operation so that host-side changes made
//! between operations are always observed.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Region used when the host leaves `dataCenter` unset or blank.
pub const DEFAULT_DATA_CENTER: &str = "us1";

/// Variable resource read when the host does not name one.
pub const DEFAULT_CAD_VAR_ID: &str = "ed98c1dc-00c0-4db0-9926-c88422405e0a";

/// Host-facing setting names, shared by instance properties and attributes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SettingName {
    BearerToken,
    OrganizationId,
    DataCenter,
    CadVarId,
    CanEdit,
}

impl SettingName {
    /// Attribute key as written by the host (`bearerToken`, `cadVarId`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BearerToken => "bearerToken",
            Self::OrganizationId => "organizationId",
            Self::DataCenter => "dataCenter",
            Self::CadVarId => "cadVarId",
            Self::CanEdit => "canEdit",
        }
    }
}

impl fmt::Display for SettingName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Values set directly on the widget instance. `None` means "not defined",
/// which lets the attribute layer supply the value.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceProperties {
    pub bearer_token: Option<String>,
    pub organization_id: Option<String>,
    pub data_center: Option<String>,
    pub cad_var_id: Option<String>,
    pub can_edit: Option<String>,
}

impl InstanceProperties {
    pub fn get(&self, name: SettingName) -> Option<&str> {
        match name {
            SettingName::BearerToken => self.bearer_token.as_deref(),
            SettingName::OrganizationId => self.organization_id.as_deref(),
            SettingName::DataCenter => self.data_center.as_deref(),
            SettingName::CadVarId => self.cad_var_id.as_deref(),
            SettingName::CanEdit => self.can_edit.as_deref(),
        }
    }
}

impl fmt::Debug for InstanceProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceProperties")
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .field("organization_id", &self.organization_id)
            .field("data_center", &self.data_center)
            .field("cad_var_id", &self.cad_var_id)
            .field("can_edit", &self.can_edit)
            .finish()
    }
}

/// Declarative string attributes, keyed by [`SettingName::as_str`].
///
/// Unknown keys are kept so a host can carry extra attributes without the
/// widget rejecting them.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<String, String>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl fmt::Debug for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (key, value) in &self.0 {
            if key == SettingName::BearerToken.as_str() {
                map.entry(key, &"<redacted>");
            } else {
                map.entry(key, value);
            }
        }
        map.finish()
    }
}

/// Both configuration layers owned by the widget host.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigSource {
    pub properties: InstanceProperties,
    pub attributes: Attributes,
}

impl ConfigSource {
    pub fn new(properties: InstanceProperties, attributes: Attributes) -> Self {
        Self { properties, attributes }
    }

    /// Raw value for a setting: the instance property when defined, otherwise
    /// the attribute of the same name.
    pub fn raw(&self, name: SettingName) -> Option<&str> {
        self.properties.get(name).or_else(|| self.attributes.get(name.as_str()))
    }

    /// Derive the effective settings. Never fails; missing required values
    /// are reported by [`Configuration::missing_fields`].
    pub fn resolve(&self) -> Configuration {
        let credential = self.raw(SettingName::BearerToken).unwrap_or_default().to_string();
        let organization_id = self.raw(SettingName::OrganizationId).unwrap_or_default().to_string();
        let region = normalize_region(self.raw(SettingName::DataCenter));
        let variable_id = self
            .raw(SettingName::CadVarId)
            .unwrap_or(DEFAULT_CAD_VAR_ID)
            .to_string();
        let edit_allowed = self
            .raw(SettingName::CanEdit)
            .is_some_and(|value| value.eq_ignore_ascii_case("true"));

        Configuration {
            credential,
            organization_id,
            region,
            variable_id,
            edit_allowed,
        }
    }
}

/// Lower-case a region code, falling back to [`DEFAULT_DATA_CENTER`] for
/// unset or blank input. Unknown codes pass through untouched.
pub fn normalize_region(raw: Option<&str>) -> String {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => value.to_ascii_lowercase(),
        None => DEFAULT_DATA_CENTER.to_string(),
    }
}

/// Effective settings for a single operation.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    #[serde(skip_serializing)]
    pub credential: String,
    pub organization_id: String,
    pub region: String,
    pub variable_id: String,
    pub edit_allowed: bool,
}

impl Configuration {
    /// Names of required settings that are absent or blank, in host naming.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.credential.trim().is_empty() {
            missing.push(SettingName::BearerToken.as_str());
        }
        if self.organization_id.trim().is_empty() {
            missing.push(SettingName::OrganizationId.as_str());
        }
        if self.variable_id.trim().is_empty() {
            missing.push(SettingName::CadVarId.as_str());
        }
        missing
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let credential = if self.credential.is_empty() { "<empty>" } else { "<redacted>" };
        f.debug_struct("Configuration")
            .field("credential", &credential)
            .field("organization_id", &self.organization_id)
            .field("region", &self.region)
            .field("variable_id", &self.variable_id)
            .field("edit_allowed", &self.edit_allowed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_with_attributes(pairs: &[(&str, &str)]) -> ConfigSource {
        ConfigSource::new(InstanceProperties::default(), pairs.iter().copied().collect())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = ConfigSource::default().resolve();
        assert_eq!(config.region, "us1");
        assert_eq!(config.variable_id, DEFAULT_CAD_VAR_ID);
        assert!(!config.edit_allowed);
        assert_eq!(config.missing_fields(), vec!["bearerToken", "organizationId"]);
    }

    #[test]
    fn instance_properties_take_precedence_over_attributes() {
        let mut source = source_with_attributes(&[("organizationId", "org-attr"), ("dataCenter", "EU2")]);
        source.properties.organization_id = Some("org-prop".into());

        let config = source.resolve();
        assert_eq!(config.organization_id, "org-prop");
        assert_eq!(config.region, "eu2");
    }

    #[test]
    fn explicit_empty_variable_id_counts_as_missing() {
        let source = source_with_attributes(&[("bearerToken", "t"), ("organizationId", "o"), ("cadVarId", "  ")]);
        let config = source.resolve();
        assert_eq!(config.missing_fields(), vec!["cadVarId"]);
    }

    #[test]
    fn blank_region_falls_back_to_default() {
        let mut source = ConfigSource::default();
        source.properties.data_center = Some(" ".into());
        assert_eq!(source.resolve().region, "us1");
    }

    #[test]
    fn edit_permission_is_case_insensitive_true_only() {
        for (raw, expected) in [("true", true), ("TRUE", true), ("True", true), ("yes", false), ("1", false), (" true", false)] {
            let source = source_with_attributes(&[("canEdit", raw)]);
            assert_eq!(source.resolve().edit_allowed, expected, "canEdit={raw:?}");
        }
    }

    #[test]
    fn debug_output_never_contains_the_credential() {
        let mut source = source_with_attributes(&[("bearerToken", "attr-secret")]);
        source.properties.bearer_token = Some("prop-secret".into());
        let rendered = format!("{:?} {:?}", source, source.resolve());
        assert!(!rendered.contains("secret"), "{rendered}");
    }
}
