//! Static knowledge about which applications and sites count as productive, grouped into
//! categories. The catalog is built once at startup and never changes afterwards.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Category reported when nothing in the catalog matches.
pub const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    /// Name shown to the user, e.g. "Development".
    pub name: String,
    /// Product or site names. Matched case-insensitively against the process name and the window
    /// title.
    pub apps: Vec<String>,
    /// Executable names, e.g. "code" or "excel". Matched only against the whole process name, since
    /// short words like these turn up in unrelated titles.
    #[serde(default)]
    pub processes: Vec<String>,
}

impl Category {
    fn new(id: &str, name: &str, apps: &[&str], processes: &[&str]) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            apps: apps.iter().map(|v| v.to_string()).collect(),
            processes: processes.iter().map(|v| v.to_string()).collect(),
        }
    }
}

/// Lookup structure over a list of [Category]. The list is the only source of truth, the lower-cased
/// views are derived from it on construction.
#[derive(Debug, Clone)]
pub struct CategoryCatalog {
    categories: Vec<Category>,
    lowered_apps: Vec<Vec<String>>,
    lowered_processes: Vec<HashSet<String>>,
    known_apps: HashSet<String>,
}

impl CategoryCatalog {
    pub fn new(categories: Vec<Category>) -> Self {
        let lowered_apps = categories
            .iter()
            .map(|category| category.apps.iter().map(|v| v.to_lowercase()).collect())
            .collect::<Vec<Vec<String>>>();
        let lowered_processes = categories
            .iter()
            .map(|category| {
                category
                    .processes
                    .iter()
                    .map(|v| bare_process_name(v))
                    .collect()
            })
            .collect::<Vec<HashSet<String>>>();
        let known_apps = lowered_apps
            .iter()
            .flatten()
            .cloned()
            .chain(lowered_processes.iter().flatten().cloned())
            .collect();
        Self {
            categories,
            lowered_apps,
            lowered_processes,
            known_apps,
        }
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Finds the display name of the first category, in declaration order, with an app contained in
    /// either the process name or the window title, or with the process among its executables.
    pub fn resolve(&self, process_name: &str, window_title: &str) -> &str {
        let executable = bare_process_name(process_name);
        let process_name = process_name.to_lowercase();
        let window_title = window_title.to_lowercase();
        self.categories
            .iter()
            .zip(self.lowered_apps.iter().zip(&self.lowered_processes))
            .find(|(_, (apps, processes))| {
                processes.contains(&executable)
                    || apps.iter().any(|app| {
                        process_name.contains(app.as_str()) || window_title.contains(app.as_str())
                    })
            })
            .map_or(UNCATEGORIZED, |(category, _)| &category.name)
    }

    /// Exact, case-insensitive membership of a process name among apps and executables. A trailing
    /// `.exe` is ignored.
    pub fn is_known_productive_app(&self, process_name: &str) -> bool {
        self.known_apps.contains(&bare_process_name(process_name))
    }

    /// Whether any app, not executable, of the catalog appears inside the window title.
    pub fn title_mentions_member(&self, window_title: &str) -> bool {
        let window_title = window_title.to_lowercase();
        self.lowered_apps
            .iter()
            .flatten()
            .any(|app| window_title.contains(app.as_str()))
    }
}

impl Default for CategoryCatalog {
    fn default() -> Self {
        Self::new(default_categories())
    }
}

fn bare_process_name(process_name: &str) -> String {
    let mut name = process_name.to_lowercase();
    if name.ends_with(".exe") {
        name.truncate(name.len() - ".exe".len());
    }
    name
}

/// Categories shipped with worktracker.
pub fn default_categories() -> Vec<Category> {
    vec![
        Category::new(
            "development",
            "Development",
            &[
                "Visual Studio Code",
                "IntelliJ IDEA",
                "PyCharm",
                "Eclipse",
                "Atom",
                "Sublime Text",
                "GitHub Desktop",
                "Sourcetree",
                "Terminal",
                "Command Prompt",
                "PowerShell",
            ],
            &[
                "code",
                "idea",
                "pycharm",
                "sublime_text",
                "gnome-terminal",
                "konsole",
                "alacritty",
                "kitty",
                "wezterm",
                "WindowsTerminal",
                "cmd",
                "pwsh",
                "nvim",
                "emacs",
            ],
        ),
        Category::new(
            "project_management",
            "Project Management & Communication",
            &[
                "Trello",
                "Asana",
                "Monday.com",
                "Jira",
                "ClickUp",
                "Slack",
                "Microsoft Teams",
                "Zoom",
                "Google Meet",
                "Webex",
                "Notion",
                "Evernote",
                "OneNote",
                "Google Docs",
                "Microsoft Word",
            ],
            &["teams", "winword"],
        ),
        Category::new(
            "sales",
            "Sales & CRM",
            &["Salesforce", "HubSpot", "Zoho CRM", "Pipedrive", "Zendesk"],
            &[],
        ),
        Category::new(
            "analytics",
            "Analytics & Reporting",
            &["Google Analytics", "Tableau", "Power BI", "Looker", "Mixpanel"],
            &[],
        ),
        Category::new(
            "design",
            "Design & Creative Work",
            &[
                "Figma",
                "Adobe Photoshop",
                "Adobe Illustrator",
                "Canva",
                "Sketch",
            ],
            &["photoshop", "illustrator"],
        ),
        Category::new(
            "data",
            "Spreadsheets & Data",
            &["Microsoft Excel", "Google Sheets", "Airtable"],
            &["excel"],
        ),
        Category::new(
            "learning",
            "Learning & Documentation",
            &[
                "Udemy",
                "Coursera",
                "Pluralsight",
                "stackoverflow.com",
                "Stack Overflow",
                "docs.microsoft.com",
                "developer.mozilla.org",
                "docs.rs",
            ],
            &[],
        ),
    ]
}
