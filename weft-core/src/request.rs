//! The request model the lifecycle operates on: method, path, multi-valued
//! parameters, request-scoped attributes and the upload mapping. Filled in
//! by whatever server front end hosts the framework.

use std::collections::HashMap;

use crate::upload::UploadMap;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "GET" => Some(Method::Get),
            "POST" => Some(Method::Post),
            _ => None,
        }
    }
}

/// One inbound request. Attributes are request-scoped markers owned by the
/// framework (e.g. the processed flag); they never come from the client.
#[derive(Clone, Debug)]
pub struct Request {
    pub method: Method,
    pub path: String,
    parameters: HashMap<String, Vec<String>>,
    attributes: HashMap<String, String>,
    uploads: UploadMap,
}

impl Request {
    pub fn new(method: Method, path: &str) -> Self {
        Request {
            method,
            path: path.to_string(),
            parameters: HashMap::new(),
            attributes: HashMap::new(),
            uploads: UploadMap::new(),
        }
    }

    pub fn get(path: &str) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: &str) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn with_parameter(mut self, name: &str, value: &str) -> Self {
        self.add_parameter(name, value);
        self
    }

    pub fn add_parameter(&mut self, name: &str, value: &str) {
        self.parameters
            .entry(name.to_string())
            .or_default()
            .push(value.to_string());
    }

    /// First value of a parameter.
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn parameter_values(&self, name: &str) -> Option<&[String]> {
        self.parameters.get(name).map(Vec::as_slice)
    }

    pub fn set_attribute(&mut self, name: &str, value: &str) {
        self.attributes.insert(name.to_string(), value.to_string());
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn uploads(&self) -> &UploadMap {
        &self.uploads
    }

    pub fn uploads_mut(&mut self) -> &mut UploadMap {
        &mut self.uploads
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multi_valued_parameters() {
        let request = Request::post("/save")
            .with_parameter("tag", "a")
            .with_parameter("tag", "b");

        assert_eq!(request.parameter("tag"), Some("a"));
        assert_eq!(
            request.parameter_values("tag"),
            Some(&["a".to_string(), "b".to_string()][..])
        );
        assert_eq!(request.parameter("missing"), None);
    }

    #[test]
    fn test_attributes_are_request_scoped() {
        let mut request = Request::get("/page");
        assert_eq!(request.attribute("seen"), None);
        request.set_attribute("seen", "true");
        assert_eq!(request.attribute("seen"), Some("true"));
    }

    #[test]
    fn test_method_parse() {
        assert_eq!(Method::parse("post"), Some(Method::Post));
        assert_eq!(Method::parse("PUT"), None);
    }
}
