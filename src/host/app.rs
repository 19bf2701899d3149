//! In-memory model of the application under test
//!
//! A deliberately small test double: a panel of selectable elements, a set
//! of mounted volumes with file entries, and a record of every UI action
//! driven through the bridge. Control messages mutate it (possibly after a
//! delay) so that scenarios have genuinely asynchronous state to poll.

use std::collections::HashMap;

use serde_json::{json, Value};

use crate::common::{Error, Result};

/// A selectable element in the app's panel
#[derive(Debug, Clone)]
pub struct Element {
    pub visible: bool,
    pub text: String,
}

impl Element {
    fn new(text: &str) -> Self {
        Self {
            visible: true,
            text: text.to_string(),
        }
    }

    fn describe(&self, selector: &str) -> Value {
        json!({
            "selector": selector,
            "visible": self.visible,
            "text": self.text,
        })
    }
}

/// Mutable application state served over the bridge
pub struct AppModel {
    loaded: bool,
    elements: HashMap<String, Element>,
    volumes: HashMap<String, Vec<String>>,
    current_volume: Option<String>,
    recorded: Vec<String>,
}

impl AppModel {
    /// Fresh model with the default volume mounted and basic entries
    pub fn new() -> Self {
        let mut model = Self {
            loaded: false,
            elements: HashMap::new(),
            volumes: HashMap::new(),
            current_volume: None,
            recorded: Vec::new(),
        };

        model.elements.insert("#file-list".to_string(), Element::new(""));
        model.elements.insert("#search-box".to_string(), Element::new(""));
        model.elements.insert("#gear-button".to_string(), Element::new("gear"));

        model.add_volume(
            "downloads",
            vec![
                "hello.txt".to_string(),
                "photos".to_string(),
                "world.ogv".to_string(),
            ],
        );

        model
    }

    fn volume_selector(name: &str) -> String {
        format!("#volume-{}", name)
    }

    /// Flip the loading flag; scenarios poll `isLoaded` for this
    pub fn mark_loaded(&mut self) {
        self.loaded = true;
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn volume_count(&self) -> usize {
        self.volumes.len()
    }

    pub fn recorded(&self) -> &[String] {
        &self.recorded
    }

    pub fn record(&mut self, what: String) {
        self.recorded.push(what);
    }

    /// Mount a volume and expose its tree element
    pub fn add_volume(&mut self, name: &str, files: Vec<String>) {
        self.volumes.insert(name.to_string(), files);
        self.elements
            .insert(Self::volume_selector(name), Element::new(name));
        if self.current_volume.is_none() {
            self.current_volume = Some(name.to_string());
        }
    }

    /// Unmount every volume and remove their tree elements
    pub fn remove_all_volumes(&mut self) {
        for name in self.volumes.keys() {
            self.elements.remove(&Self::volume_selector(name));
        }
        self.volumes.clear();
        self.current_volume = None;
    }

    /// Add file entries to a mounted volume; false if it isn't mounted
    pub fn add_entries(&mut self, volume: &str, files: Vec<String>) -> bool {
        match self.volumes.get_mut(volume) {
            Some(entries) => {
                entries.extend(files);
                true
            }
            None => false,
        }
    }

    /// File entries of the currently selected volume, sorted
    pub fn current_files(&self) -> Vec<String> {
        let mut files = self
            .current_volume
            .as_ref()
            .and_then(|v| self.volumes.get(v))
            .cloned()
            .unwrap_or_default();
        files.sort();
        files
    }

    /// Dispatch an invoke-by-name operation
    pub fn invoke(&mut self, name: &str, args: &[Value]) -> Result<Value> {
        match name {
            "isLoaded" => Ok(json!(self.loaded)),

            "volumeCount" => Ok(json!(self.volume_count())),

            "fileList" => Ok(json!(self.current_files())),

            "query" => {
                let selector = str_arg(name, args, 0)?;
                Ok(self
                    .elements
                    .get(selector)
                    .filter(|el| el.visible)
                    .map(|el| el.describe(selector))
                    .unwrap_or(Value::Null))
            }

            "queryAll" => {
                let prefix = str_arg(name, args, 0)?;
                let mut matches: Vec<(String, Value)> = self
                    .elements
                    .iter()
                    .filter(|(selector, el)| selector.starts_with(prefix) && el.visible)
                    .map(|(selector, el)| (selector.clone(), el.describe(selector)))
                    .collect();
                matches.sort_by(|a, b| a.0.cmp(&b.0));
                Ok(Value::Array(matches.into_iter().map(|(_, v)| v).collect()))
            }

            "click" => {
                let selector = str_arg(name, args, 0)?.to_string();
                self.record(format!("click {}", selector));

                let hit = self
                    .elements
                    .get(&selector)
                    .map(|el| el.visible)
                    .unwrap_or(false);
                if hit {
                    // Clicking a volume element selects it
                    if let Some(volume) = selector.strip_prefix("#volume-") {
                        if self.volumes.contains_key(volume) {
                            self.current_volume = Some(volume.to_string());
                        }
                    }
                }
                Ok(json!(hit))
            }

            "input" => {
                let selector = str_arg(name, args, 0)?.to_string();
                let text = str_arg(name, args, 1)?.to_string();
                self.record(format!("input {} {}", selector, text));

                match self.elements.get_mut(&selector) {
                    Some(el) if el.visible => {
                        el.text = text;
                        Ok(json!(true))
                    }
                    _ => Ok(json!(false)),
                }
            }

            "recordedCalls" => {
                let filter = args.first().and_then(Value::as_str);
                let calls: Vec<&String> = self
                    .recorded
                    .iter()
                    .filter(|r| filter.map(|f| r.starts_with(f)).unwrap_or(true))
                    .collect();
                Ok(json!(calls))
            }

            "reset" => {
                *self = Self::new();
                self.loaded = true;
                Ok(json!(true))
            }

            _ => Err(Error::UnknownOperation(name.to_string())),
        }
    }
}

impl Default for AppModel {
    fn default() -> Self {
        Self::new()
    }
}

fn str_arg<'a>(op: &str, args: &'a [Value], index: usize) -> Result<&'a str> {
    args.get(index).and_then(Value::as_str).ok_or_else(|| {
        Error::call_failed(
            op,
            &format!("requires a string argument at position {}", index),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_click_missing_element_returns_false() {
        let mut app = AppModel::new();
        let hit = app.invoke("click", &[json!("#volume-usb")]).unwrap();
        assert_eq!(hit, json!(false));
    }

    #[test]
    fn test_click_is_recorded_even_when_it_misses() {
        let mut app = AppModel::new();
        app.invoke("click", &[json!("#nope")]).unwrap();
        let calls = app.invoke("recordedCalls", &[json!("click")]).unwrap();
        assert_eq!(calls, json!(["click #nope"]));
    }

    #[test]
    fn test_mounted_volume_becomes_clickable_and_selects_its_files() {
        let mut app = AppModel::new();
        app.add_volume("usb", vec!["fake.img".to_string()]);

        let element = app.invoke("query", &[json!("#volume-usb")]).unwrap();
        assert_eq!(element["text"], "usb");

        let hit = app.invoke("click", &[json!("#volume-usb")]).unwrap();
        assert_eq!(hit, json!(true));

        let files = app.invoke("fileList", &[]).unwrap();
        assert_eq!(files, json!(["fake.img"]));
    }

    #[test]
    fn test_unmount_removes_volumes_and_their_elements() {
        let mut app = AppModel::new();
        app.remove_all_volumes();
        assert_eq!(app.volume_count(), 0);
        let element = app.invoke("query", &[json!("#volume-downloads")]).unwrap();
        assert!(element.is_null());
    }

    #[test]
    fn test_file_list_is_sorted() {
        let mut app = AppModel::new();
        app.add_entries("downloads", vec!["aaa.txt".to_string()]);
        let files = app.invoke("fileList", &[]).unwrap();
        assert_eq!(files, json!(["aaa.txt", "hello.txt", "photos", "world.ogv"]));
    }

    #[test]
    fn test_unknown_operation_is_rejected() {
        let mut app = AppModel::new();
        let err = app.invoke("teleport", &[]).unwrap_err();
        assert!(matches!(err, Error::UnknownOperation(_)));
    }

    #[test]
    fn test_query_requires_selector_argument() {
        let mut app = AppModel::new();
        let err = app.invoke("query", &[]).unwrap_err();
        assert!(matches!(err, Error::CallFailed { .. }));
    }
}
