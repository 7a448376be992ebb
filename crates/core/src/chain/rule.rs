//! Named module rules with nested one-of groups.

use crate::merge::RULE_NAMES_KEY;
use indexmap::IndexMap;
use serde_json::{Map, Value};

/// A named, addressable module rule. Later mutations can look the rule up by
/// name and adjust what an earlier plugin configured.
#[derive(Debug, Clone)]
pub struct Rule {
    name: String,
    test: Option<String>,
    include: Vec<String>,
    exclude: Vec<String>,
    resource_query: Option<String>,
    uses: IndexMap<String, LoaderUse>,
    one_of: IndexMap<String, Rule>,
}

impl Rule {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            test: None,
            include: Vec::new(),
            exclude: Vec::new(),
            resource_query: None,
            uses: IndexMap::new(),
            one_of: IndexMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the file pattern this rule applies to.
    pub fn test(&mut self, pattern: &str) -> &mut Self {
        self.test = Some(pattern.to_string());
        self
    }

    pub fn resource_query(&mut self, query: &str) -> &mut Self {
        self.resource_query = Some(query.to_string());
        self
    }

    pub fn include(&mut self, path: impl Into<String>) -> &mut Self {
        self.include.push(path.into());
        self
    }

    pub fn exclude(&mut self, path: impl Into<String>) -> &mut Self {
        self.exclude.push(path.into());
        self
    }

    /// Add or fetch a named loader use on this rule.
    pub fn use_loader(&mut self, name: &str) -> &mut LoaderUse {
        self.uses
            .entry(name.to_string())
            .or_insert_with(|| LoaderUse::new(name))
    }

    pub fn get_use_mut(&mut self, name: &str) -> Option<&mut LoaderUse> {
        self.uses.get_mut(name)
    }

    /// Add or fetch a named alternative sub-rule group.
    pub fn one_of(&mut self, name: &str) -> &mut Rule {
        self.one_of
            .entry(name.to_string())
            .or_insert_with(|| Rule::new(name))
    }

    pub fn get_one_of_mut(&mut self, name: &str) -> Option<&mut Rule> {
        self.one_of.get_mut(name)
    }

    pub(crate) fn to_value(&self, parents: &[String]) -> Value {
        let mut obj = Map::new();
        if let Some(test) = &self.test {
            obj.insert("test".to_string(), Value::String(test.clone()));
        }
        if !self.include.is_empty() {
            obj.insert("include".to_string(), string_array(&self.include));
        }
        if !self.exclude.is_empty() {
            obj.insert("exclude".to_string(), string_array(&self.exclude));
        }
        if let Some(query) = &self.resource_query {
            obj.insert("resourceQuery".to_string(), Value::String(query.clone()));
        }
        if !self.uses.is_empty() {
            let uses: Vec<Value> = self.uses.values().map(LoaderUse::to_value).collect();
            obj.insert("use".to_string(), Value::Array(uses));
        }

        let mut names: Vec<String> = parents.to_vec();
        names.push(self.name.clone());

        if !self.one_of.is_empty() {
            let children: Vec<Value> = self
                .one_of
                .values()
                .map(|child| child.to_value(&names))
                .collect();
            obj.insert("oneOf".to_string(), Value::Array(children));
        }

        obj.insert(RULE_NAMES_KEY.to_string(), string_array(&names));
        Value::Object(obj)
    }
}

/// A single loader application inside a rule.
#[derive(Debug, Clone)]
pub struct LoaderUse {
    loader: String,
    options: Option<Value>,
}

impl LoaderUse {
    fn new(name: &str) -> Self {
        Self {
            loader: name.to_string(),
            options: None,
        }
    }

    pub fn loader(&mut self, loader: &str) -> &mut Self {
        self.loader = loader.to_string();
        self
    }

    pub fn options(&mut self, options: Value) -> &mut Self {
        self.options = Some(options);
        self
    }

    fn to_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("loader".to_string(), Value::String(self.loader.clone()));
        if let Some(options) = &self.options {
            obj.insert("options".to_string(), options.clone());
        }
        Value::Object(obj)
    }
}

fn string_array(items: &[String]) -> Value {
    Value::Array(items.iter().map(|s| Value::String(s.clone())).collect())
}
