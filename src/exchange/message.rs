use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// A payload carried in one of the exchange's message slots
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub body: String,
    pub headers: HashMap<String, String>,
    /// Headers the receiving participant must understand before processing
    #[serde(default)]
    pub must_understand: BTreeSet<String>,
}

impl Message {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            ..Default::default()
        }
    }

    /// Build a message whose body is the JSON encoding of `payload`
    pub fn from_json<T: Serialize>(payload: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::to_string(payload)?))
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Add a header and mark it as must-understand
    pub fn with_required_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        let name = name.into();
        self.must_understand.insert(name.clone());
        self.headers.insert(name, value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Return the first must-understand header not present in `understood`
    pub fn first_not_understood<'a, I>(&'a self, understood: I) -> Option<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let understood: BTreeSet<&str> = understood.into_iter().collect();
        self.must_understand
            .iter()
            .map(String::as_str)
            .find(|header| !understood.contains(header))
    }
}
