//! Message bundles: (bundle, key) -> label/error text resolution with
//! positional argument formatting. Unmapped keys resolve to themselves so
//! missing translations degrade visibly instead of failing a render.

use std::collections::HashMap;

/// Registered message bundles, looked up by name.
#[derive(Debug, Clone, Default)]
pub struct MessageBundles {
    bundles: HashMap<String, HashMap<String, String>>,
}

impl MessageBundles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_bundle(&mut self, name: &str, entries: &[(&str, &str)]) {
        let bundle = self.bundles.entry(name.to_string()).or_default();
        for (key, text) in entries {
            bundle.insert((*key).to_string(), (*text).to_string());
        }
    }

    /// Resolve a message. Falls back to the key itself when the bundle or
    /// the key is unknown.
    pub fn message(&self, bundle: Option<&str>, key: &str, args: &[&str]) -> String {
        let text = bundle
            .and_then(|name| self.bundles.get(name))
            .and_then(|bundle| bundle.get(key))
            .map(String::as_str)
            .unwrap_or(key);
        format_message(text, args)
    }
}

/// Replace `{0}`, `{1}`, ... placeholders with positional arguments.
fn format_message(text: &str, args: &[&str]) -> String {
    let mut formatted = text.to_string();
    for (index, arg) in args.iter().enumerate() {
        formatted = formatted.replace(&format!("{{{}}}", index), arg);
    }
    formatted
}
