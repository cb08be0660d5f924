//! Help registry.
//!
//! Commands describe themselves with a usage string, a description and
//! search tags. `!help` lists everything; `!help <query>` lists entries with
//! a tag containing the query.

use std::collections::HashMap;

use parking_lot::Mutex;

/// One command's help.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HelpEntry {
    /// How to invoke the command, e.g. `!help <query>`.
    pub usage: String,
    /// What the command does.
    pub description: Option<String>,
    /// Search tags; the usage string when none were given.
    pub tags: Vec<String>,
}

/// Help entries keyed by command name.
#[derive(Debug, Default)]
pub struct HelpRegistry {
    entries: Mutex<HashMap<String, HelpEntry>>,
}

impl HelpRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records help for `name`.
    ///
    /// Empty strings and an empty tag list mean "not given". Calling again
    /// for the same name only fills fields that are still unset.
    pub fn update(&self, name: &str, usage: &str, description: &str, tags: &[&str]) {
        let mut tags: Vec<String> = tags.iter().map(|t| t.to_string()).collect();
        if tags.is_empty() && !usage.is_empty() {
            tags.push(usage.to_string());
        }

        let mut entries = self.entries.lock();
        let entry = entries.entry(name.to_string()).or_default();
        if entry.usage.is_empty() {
            entry.usage = usage.to_string();
        }
        if entry.description.is_none() && !description.is_empty() {
            entry.description = Some(description.to_string());
        }
        if entry.tags.is_empty() {
            entry.tags = tags;
        }
    }

    /// Lists entries sorted by usage.
    ///
    /// With a filter, only entries with a tag containing it are returned.
    pub fn list(&self, filter: Option<&str>) -> Vec<HelpEntry> {
        let entries = self.entries.lock();
        let mut results: Vec<HelpEntry> = entries
            .values()
            .filter(|entry| match filter {
                Some(query) if !query.is_empty() => {
                    entry.tags.iter().any(|tag| tag.contains(query))
                }
                _ => true,
            })
            .cloned()
            .collect();
        results.sort_by(|a, b| a.usage.cmp(&b.usage));
        results
    }

    /// Renders [`list`](Self::list) as one line per entry:
    /// `` `usage` - description ``.
    pub fn render(&self, filter: Option<&str>) -> String {
        let mut reply = String::new();
        for entry in self.list(filter) {
            match &entry.description {
                Some(description) => {
                    reply.push_str(&format!("`{}` - {}\n", entry.usage, description))
                }
                None => reply.push_str(&format!("`{}`\n", entry.usage)),
            }
        }
        reply
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_default_to_usage() {
        let help = HelpRegistry::new();
        help.update("lunch", "lunch", "Suggest a place", &[]);

        let entries = help.list(None);
        assert_eq!(entries[0].tags, vec!["lunch".to_string()]);
    }

    #[test]
    fn test_second_update_fills_only_unset_fields() {
        let help = HelpRegistry::new();
        help.update("coffee", "coffee", "", &[]);
        help.update("coffee", "ignored", "Order a coffee", &["drink"]);

        let entry = &help.list(None)[0];
        assert_eq!(entry.usage, "coffee");
        assert_eq!(entry.description.as_deref(), Some("Order a coffee"));
        assert_eq!(entry.tags, vec!["coffee".to_string()]);
    }

    #[test]
    fn test_list_sorts_and_filters_by_tag() {
        let help = HelpRegistry::new();
        help.update("random", "random", "Pick a number", &["number", "dice"]);
        help.update("help", "!help", "Get help for commands", &[]);
        help.update("help_query", "!help <query>", "Get help for commands", &[]);

        let usages: Vec<String> = help.list(None).into_iter().map(|e| e.usage).collect();
        assert_eq!(usages, vec!["!help", "!help <query>", "random"]);

        let filtered = help.list(Some("dic"));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].usage, "random");

        assert!(help.list(Some("nothing")).is_empty());
    }

    #[test]
    fn test_render_formats_lines() {
        let help = HelpRegistry::new();
        help.update("a", "alpha", "First", &[]);
        help.update("b", "beta", "", &[]);

        assert_eq!(help.render(None), "`alpha` - First\n`beta`\n");
    }
}
