//! Workflow records
//!
//! A [`Todo`] is one package that has to be republished. It is persisted in
//! the session document; the `published`, `ready` and `unmet_deps` flags are
//! derived on every load and never written.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::format::{render, FormatError, KeyError, Resolve};
use super::hash::Hash;
use super::layout::Layout;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Todo {
    pub name: String,

    /// Import path
    pub path: String,

    pub level: usize,

    /// Hash the package had when the session was created
    #[serde(default, skip_serializing_if = "Hash::is_empty")]
    pub orig_hash: Hash,

    /// Direct triggers: what this package must be updated to pick up
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deps: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub also_update: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indirect: Vec<String>,

    #[serde(default, skip_serializing_if = "Hash::is_empty")]
    pub new_hash: Hash,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub new_version: String,

    /// Dependency hashes recorded when the package was published
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub new_deps: BTreeMap<String, Hash>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, String>,

    /// Published and every recorded dependency hash still matches
    #[serde(skip)]
    pub published: bool,

    /// Not published, but every dependency is
    #[serde(skip)]
    pub ready: bool,

    #[serde(skip)]
    pub unmet_deps: Vec<String>,
}

impl Todo {
    /// Listing order: level, then number of deps, then deps, then name
    pub fn order(&self, other: &Todo) -> Ordering {
        self.level
            .cmp(&other.level)
            .then_with(|| self.deps.len().cmp(&other.deps.len()))
            .then_with(|| self.deps.cmp(&other.deps))
            .then_with(|| self.name.cmp(&other.name))
    }

    /// Publication was recorded but no longer holds
    pub fn is_invalidated(&self) -> bool {
        !self.new_deps.is_empty() && !self.published
    }

    /// Forgets any recorded publication
    pub fn clear_publication(&mut self) {
        self.new_hash = Hash::default();
        self.new_version.clear();
        self.new_deps.clear();
    }
}

/// Description of a built-in key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyDesc {
    pub name: &'static str,
    pub alias: Option<&'static str>,
    pub desc: &'static str,
    /// Reserved but left out of help output
    pub hidden: bool,
}

const fn key(name: &'static str, alias: Option<&'static str>, desc: &'static str) -> KeyDesc {
    KeyDesc {
        name,
        alias,
        desc,
        hidden: false,
    }
}

/// Keys available before a session exists
pub const BASIC_KEYS: &[KeyDesc] = &[
    key("name", None, "package name"),
    key("path", None, "import path"),
    key("dir", None, "directory package is located in"),
    key("giturl", None, "git url for downloading packages"),
    key("deps", None, "space separated list of direct deps."),
];

pub const ALL_KEYS: &[KeyDesc] = &[
    key("name", None, "package name"),
    key("path", None, "import path"),
    key("dir", None, "directory package is located in"),
    key("giturl", None, "git url for downloading packages"),
    key("deps", None, "space separated list of direct deps."),
    key("ready", None, "the string READY if all deps. are published"),
    key("published", None, "the string PUBLISHED if published"),
    key("invalidated", None, "the string INVALIDATED if invalidated"),
    key("ver", Some("version"), "current version if published"),
    key("hash", None, "current hash if published"),
    key("unmet", Some("unmetdeps"), "space separated list of unmet deps."),
    KeyDesc {
        name: "level",
        alias: None,
        desc: "level in the reverse dep. graph",
        hidden: true,
    },
];

/// True if `key` names a built-in and cannot be used for metadata
pub fn is_reserved(key: &str) -> bool {
    ALL_KEYS
        .iter()
        .any(|desc| desc.name == key || desc.alias == Some(key))
}

/// Two-column listing of keys for help output
pub fn keys_help(keys: &[KeyDesc]) -> String {
    let labels: Vec<(String, &str)> = keys
        .iter()
        .filter(|desc| !desc.hidden)
        .map(|desc| {
            let label = match desc.alias {
                Some(alias) => format!("{}|{}", desc.name, alias),
                None => desc.name.to_string(),
            };
            (label, desc.desc)
        })
        .collect();
    let width = labels.iter().map(|(label, _)| label.len()).max().unwrap_or(0);

    labels
        .iter()
        .map(|(label, desc)| format!("  {:<width$}  {}\n", label, desc, width = width))
        .collect()
}

/// A [`Todo`] together with the context needed to resolve keys
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    todo: &'a Todo,
    defaults: &'a BTreeMap<String, String>,
    layout: &'a Layout,
}

impl<'a> Record<'a> {
    pub fn new(todo: &'a Todo, defaults: &'a BTreeMap<String, String>, layout: &'a Layout) -> Self {
        Self {
            todo,
            defaults,
            layout,
        }
    }

    pub fn todo(&self) -> &'a Todo {
        self.todo
    }

    /// True if `key` currently resolves to a value
    pub fn matches(&self, key: &str) -> bool {
        matches!(self.get(key), Ok(Some(_)))
    }

    pub fn render(&self, template: &str) -> Result<String, FormatError> {
        render(template, self)
    }

    fn not_yet_published(&self, key: &str) -> KeyError {
        KeyError::NotYetPublished {
            path: self.todo.path.clone(),
            key: key.to_string(),
        }
    }

    fn git_url(&self) -> Result<String, KeyError> {
        let (host, repo) = self
            .todo
            .path
            .split_once('/')
            .filter(|(host, repo)| !host.is_empty() && !repo.is_empty())
            .ok_or_else(|| KeyError::Invalid {
                path: self.todo.path.clone(),
                reason: "ill-formed import path, cannot derive git url".to_string(),
            })?;
        Ok(format!("git@{}:{}.git", host, repo))
    }
}

fn joined(names: &[String]) -> Option<String> {
    (!names.is_empty()).then(|| names.join(" "))
}

impl Resolve for Record<'_> {
    fn get(&self, key: &str) -> Result<Option<String>, KeyError> {
        let todo = self.todo;
        let value = match key {
            "name" => Some(todo.name.clone()),
            "path" => Some(todo.path.clone()),
            "dir" => Some(self.layout.source_dir(&todo.path).display().to_string()),
            "giturl" => Some(self.git_url()?),
            "ver" | "version" => {
                if !todo.published {
                    return Err(self.not_yet_published(key));
                }
                Some(todo.new_version.clone())
            }
            "hash" => {
                if !todo.published {
                    return Err(self.not_yet_published(key));
                }
                Some(todo.new_hash.to_string())
            }
            "published" => todo.published.then(|| "PUBLISHED".to_string()),
            "ready" => todo.ready.then(|| "READY".to_string()),
            "invalidated" => todo.is_invalidated().then(|| "INVALIDATED".to_string()),
            "deps" => joined(&todo.deps),
            "unmet" | "unmetdeps" => joined(&todo.unmet_deps),
            "level" => Some(todo.level.to_string()),
            _ => match todo.meta.get(key).or_else(|| self.defaults.get(key)) {
                Some(value) => Some(value.clone()),
                None => {
                    return Err(KeyError::Undefined {
                        path: todo.path.clone(),
                        key: key.to_string(),
                    })
                }
            },
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn todo() -> Todo {
        Todo {
            name: "go-log".to_string(),
            path: "github.com/ipfs/go-log".to_string(),
            level: 1,
            deps: vec!["go-core".to_string(), "go-util".to_string()],
            ..Todo::default()
        }
    }

    fn get(
        todo: &Todo,
        defaults: &BTreeMap<String, String>,
        key: &str,
    ) -> Result<Option<String>, KeyError> {
        let layout = Layout::new("/go");
        Record::new(todo, defaults, &layout).get(key)
    }

    #[test]
    fn identity_keys() {
        let todo = todo();
        let defaults = BTreeMap::new();

        assert_eq!(get(&todo, &defaults, "name").unwrap().as_deref(), Some("go-log"));
        assert_eq!(
            get(&todo, &defaults, "dir").unwrap().as_deref(),
            Some("/go/src/github.com/ipfs/go-log")
        );
        assert_eq!(
            get(&todo, &defaults, "giturl").unwrap().as_deref(),
            Some("git@github.com:ipfs/go-log.git")
        );
        assert_eq!(
            get(&todo, &defaults, "deps").unwrap().as_deref(),
            Some("go-core go-util")
        );
        assert_eq!(get(&todo, &defaults, "level").unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn giturl_needs_host_and_repo() {
        let mut todo = todo();
        todo.path = "localpkg".to_string();

        let err = get(&todo, &BTreeMap::new(), "giturl").unwrap_err();
        assert!(!err.is_soft());
    }

    #[test]
    fn version_and_hash_require_publication() {
        let mut todo = todo();
        todo.new_hash = Hash::from("QmNew");
        todo.new_version = "1.2.0".to_string();
        let defaults = BTreeMap::new();

        assert!(matches!(
            get(&todo, &defaults, "version"),
            Err(KeyError::NotYetPublished { .. })
        ));

        todo.published = true;
        assert_eq!(get(&todo, &defaults, "ver").unwrap().as_deref(), Some("1.2.0"));
        assert_eq!(get(&todo, &defaults, "hash").unwrap().as_deref(), Some("QmNew"));
    }

    #[test]
    fn markers_are_presence_only() {
        let mut todo = todo();
        let defaults = BTreeMap::new();

        assert_eq!(get(&todo, &defaults, "published").unwrap(), None);
        assert_eq!(get(&todo, &defaults, "ready").unwrap(), None);
        assert_eq!(get(&todo, &defaults, "invalidated").unwrap(), None);
        assert_eq!(get(&todo, &defaults, "unmet").unwrap(), None);

        todo.ready = true;
        todo.unmet_deps = vec!["go-core".to_string()];
        todo.new_deps.insert("go-core".to_string(), Hash::from("QmOld"));
        assert_eq!(get(&todo, &defaults, "ready").unwrap().as_deref(), Some("READY"));
        assert_eq!(
            get(&todo, &defaults, "invalidated").unwrap().as_deref(),
            Some("INVALIDATED")
        );
        assert_eq!(get(&todo, &defaults, "unmetdeps").unwrap().as_deref(), Some("go-core"));
    }

    #[test]
    fn meta_then_defaults_then_undefined() {
        let mut todo = todo();
        todo.meta.insert("branch".to_string(), "fix-log".to_string());
        let mut defaults = BTreeMap::new();
        defaults.insert("branch".to_string(), "master".to_string());
        defaults.insert("owner".to_string(), "ipfs".to_string());

        assert_eq!(get(&todo, &defaults, "branch").unwrap().as_deref(), Some("fix-log"));
        assert_eq!(get(&todo, &defaults, "owner").unwrap().as_deref(), Some("ipfs"));
        assert!(matches!(
            get(&todo, &defaults, "missing"),
            Err(KeyError::Undefined { .. })
        ));
    }

    #[test]
    fn render_status_line() {
        let mut todo = todo();
        todo.unmet_deps = vec!["go-core".to_string()];
        let defaults = BTreeMap::new();
        let layout = Layout::new("/go");
        let record = Record::new(&todo, &defaults, &layout);

        let line = record
            .render("$path[ ($invalidated)][ = $hash][ $ready][ :: $unmet]")
            .unwrap();
        assert_eq!(line, "github.com/ipfs/go-log :: go-core");
        assert!(record.matches("deps"));
        assert!(!record.matches("published"));
        assert!(!record.matches("nope"));
    }

    #[test]
    fn reserved_keys_include_aliases() {
        assert!(is_reserved("name"));
        assert!(is_reserved("version"));
        assert!(is_reserved("unmetdeps"));
        assert!(is_reserved("level"));
        assert!(!is_reserved("branch"));
    }

    #[test]
    fn ordering_by_level_then_deps_then_name() {
        let mut a = todo();
        a.level = 0;
        a.deps.clear();
        let mut b = todo();
        b.deps = vec!["z".to_string()];
        let mut c = todo();
        c.deps = vec!["a".to_string()];
        let mut d = c.clone();
        d.name = "aaa".to_string();

        assert_eq!(a.order(&b), Ordering::Less);
        assert_eq!(b.order(&todo()), Ordering::Less);
        assert_eq!(c.order(&b), Ordering::Less);
        assert_eq!(d.order(&c), Ordering::Less);
    }

    #[test]
    fn derived_flags_are_not_persisted() {
        let mut todo = todo();
        todo.published = true;
        todo.ready = true;
        todo.unmet_deps = vec!["x".to_string()];

        let json = serde_json::to_value(&todo).unwrap();
        assert!(json.get("Published").is_none());
        assert!(json.get("Ready").is_none());
        assert!(json.get("UnmetDeps").is_none());
        assert_eq!(json["Name"], "go-log");
        assert!(json.get("OrigHash").is_none());
    }

    #[test]
    fn keys_help_aligns_columns() {
        let help = keys_help(ALL_KEYS);
        assert!(help.contains("  ver|version  "));
        assert!(!help.contains("level"));
    }
}
