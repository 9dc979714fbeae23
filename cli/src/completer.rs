//! TAB completion for command keywords, applications, resources and
//! attribute names
//!
//! The word being completed is classified by its position: the first word
//! is a keyword, then an application, a resource, and finally `name=`
//! parameters of that resource.

use colored::*;
use rustyline::completion::{Completer, Pair};
use std::collections::HashMap;

pub(crate) const KEYWORDS: &[&str] = &[
    "CREATE", "READ", "UPDATE", "DELETE", "NEXT", "APPS", "DESCRIBE", "LOGIN", "LOGOUT",
    "REGISTER", "REFRESH", "KEY", "NOKEY", "SET", "HELP", "EXIT", "QUIT",
];

/// Keywords followed by `<app> <resource>`
const TARGETED_KEYWORDS: &[&str] = &["CREATE", "READ", "UPDATE", "DELETE", "DESCRIBE"];

/// Read options offered after the target of a READ
const READ_OPTIONS: &[&str] = &["_limit", "_expand", "_view", "eid", "pageState"];

#[derive(Debug, Clone, Copy)]
enum CompletionCategory {
    Keyword,
    Application,
    Resource,
    Attribute,
}

fn styled(text: &str, category: CompletionCategory) -> Pair {
    let label = match category {
        CompletionCategory::Keyword => format!("{}  {}", text.blue().bold(), "keyword".dimmed()),
        CompletionCategory::Application => format!("{}  {}", text.cyan(), "app".dimmed()),
        CompletionCategory::Resource => format!("{}  {}", text.green(), "resource".dimmed()),
        CompletionCategory::Attribute => format!("{}  {}", text.yellow(), "attribute".dimmed()),
    };
    Pair {
        display: label,
        replacement: text.to_string(),
    }
}

/// Auto-completer fed from the loaded schema
#[derive(Debug, Default)]
pub struct AutoCompleter {
    /// application -> resource names
    resources: HashMap<String, Vec<String>>,

    /// (application, resource) -> settable attribute names
    attributes: HashMap<(String, String), Vec<String>>,
}

impl AutoCompleter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_resources(&mut self, application: String, resources: Vec<String>) {
        self.resources.insert(application, resources);
    }

    pub fn set_attributes(&mut self, application: String, resource: String, names: Vec<String>) {
        self.attributes.insert((application, resource), names);
    }

    /// Candidates for the word ending at `pos`, with the byte offset the
    /// replacement starts at.
    pub fn candidates(&self, line: &str, pos: usize) -> (usize, Vec<Pair>) {
        let upto = &line[..pos];
        let start = upto
            .rfind(char::is_whitespace)
            .map(|i| i + 1)
            .unwrap_or(0);
        let word = &upto[start..];
        let previous: Vec<&str> = upto[..start].split_whitespace().collect();

        let results = match previous.as_slice() {
            [] => Self::matching(KEYWORDS.iter().copied(), word, true, CompletionCategory::Keyword),
            [keyword] if Self::is_targeted(keyword) => {
                let mut apps: Vec<&str> = self.resources.keys().map(String::as_str).collect();
                apps.sort_unstable();
                Self::matching(apps.into_iter(), word, false, CompletionCategory::Application)
            }
            [keyword, app] if Self::is_targeted(keyword) => match self.resources.get(*app) {
                Some(resources) => Self::matching(
                    resources.iter().map(String::as_str),
                    word,
                    false,
                    CompletionCategory::Resource,
                ),
                None => Vec::new(),
            },
            [keyword, app, resource, ..]
                if Self::is_targeted(keyword) && !keyword.eq_ignore_ascii_case("DESCRIBE") =>
            {
                let key = (app.to_string(), resource.to_string());
                let mut names: Vec<&str> = self
                    .attributes
                    .get(&key)
                    .map(|names| names.iter().map(String::as_str).collect())
                    .unwrap_or_default();
                if keyword.eq_ignore_ascii_case("READ") {
                    names.extend(READ_OPTIONS);
                }
                Self::matching(names.into_iter(), word, false, CompletionCategory::Attribute)
                    .into_iter()
                    .map(|mut pair| {
                        pair.replacement.push('=');
                        pair
                    })
                    .collect()
            }
            _ => Vec::new(),
        };

        (start, results)
    }

    fn is_targeted(keyword: &str) -> bool {
        TARGETED_KEYWORDS
            .iter()
            .any(|k| k.eq_ignore_ascii_case(keyword))
    }

    fn matching<'a>(
        options: impl Iterator<Item = &'a str>,
        word: &str,
        ignore_case: bool,
        category: CompletionCategory,
    ) -> Vec<Pair> {
        let word_upper = word.to_ascii_uppercase();
        let lowercase_input = !word.is_empty() && word.chars().all(|c| !c.is_ascii_uppercase());
        options
            .filter(|option| {
                if ignore_case {
                    option.to_ascii_uppercase().starts_with(&word_upper)
                } else {
                    option.starts_with(word)
                }
            })
            .map(|option| {
                if ignore_case && lowercase_input {
                    styled(&option.to_ascii_lowercase(), category)
                } else {
                    styled(option, category)
                }
            })
            .collect()
    }
}

impl Completer for AutoCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        Ok(self.candidates(line, pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completer() -> AutoCompleter {
        let mut completer = AutoCompleter::new();
        completer.set_resources("crm".into(), vec!["persons".into(), "projects".into()]);
        completer.set_attributes(
            "crm".into(),
            "persons".into(),
            vec!["pk".into(), "ck".into(), "firstName".into()],
        );
        completer
    }

    fn replacements(line: &str) -> Vec<String> {
        let (_, pairs) = completer().candidates(line, line.len());
        pairs.into_iter().map(|p| p.replacement).collect()
    }

    #[test]
    fn test_keyword_completion_keeps_case() {
        assert_eq!(replacements("DE"), vec!["DELETE", "DESCRIBE"]);
        assert_eq!(replacements("nok"), vec!["nokey"]);
    }

    #[test]
    fn test_target_completion() {
        assert_eq!(replacements("READ c"), vec!["crm"]);
        assert_eq!(replacements("read crm p"), vec!["persons", "projects"]);
        assert!(replacements("read nope p").is_empty());
    }

    #[test]
    fn test_parameter_completion() {
        assert_eq!(replacements("CREATE crm persons first"), vec!["firstName="]);
        assert_eq!(replacements("READ crm persons pk=A _l"), vec!["_limit="]);
        assert!(replacements("DESCRIBE crm persons ").is_empty());
    }

    #[test]
    fn test_replacement_start() {
        let (start, _) = completer().candidates("READ crm per", 12);
        assert_eq!(start, 9);
    }
}
