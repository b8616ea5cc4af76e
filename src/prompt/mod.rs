//! Prompt templates: loaded from the prompts folder and filled with named values.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

/// A prompt template with `{name}` slots. `{{` and `}}` stand for literal braces.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    text: String,
}

impl PromptTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Load `<dir>/<name>.txt`. Read on every call, never cached.
    pub fn load(dir: &Path, name: &str) -> Result<Self> {
        let path = prompt_path(dir, name);
        if !path.exists() {
            bail!("Prompt file '{}.txt' not found in the prompts folder.", name);
        }
        let text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read prompt '{}'", path.display()))?;
        Ok(Self::new(text))
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Substitute every `{name}` slot from `values`.
    ///
    /// Unknown names and unbalanced braces are errors.
    pub fn render(&self, values: &[(&str, &str)]) -> Result<String> {
        let mut out = String::with_capacity(self.text.len() + values.iter().map(|(_, v)| v.len()).sum::<usize>());
        let mut chars = self.text.char_indices().peekable();

        while let Some((i, c)) = chars.next() {
            match c {
                '{' if chars.peek().map(|&(_, n)| n) == Some('{') => {
                    chars.next();
                    out.push('{');
                }
                '{' => {
                    let rest = &self.text[i + 1..];
                    let Some(end) = rest.find('}') else {
                        bail!("Single '{{' encountered in prompt template");
                    };
                    let field = &rest[..end];
                    if field.contains('{') {
                        bail!("Unexpected '{{' in prompt field name");
                    }
                    let Some((_, value)) = values.iter().find(|(k, _)| *k == field) else {
                        bail!("Unknown prompt field '{{{}}}'", field);
                    };
                    out.push_str(value);
                    // Skip the field name and its closing brace.
                    for _ in 0..field.chars().count() + 1 {
                        chars.next();
                    }
                }
                '}' if chars.peek().map(|&(_, n)| n) == Some('}') => {
                    chars.next();
                    out.push('}');
                }
                '}' => bail!("Single '}}' encountered in prompt template"),
                other => out.push(other),
            }
        }
        Ok(out)
    }

    /// Fill the two report slots, `master_content` and `example_content`.
    pub fn render_report(&self, master_content: &str, example_content: &str) -> Result<String> {
        self.render(&[
            ("master_content", master_content),
            ("example_content", example_content),
        ])
    }
}

pub fn prompt_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.txt", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_both_slots() {
        let t = PromptTemplate::new("Docs:\n{master_content}\nStyle:\n{example_content}\n");
        let out = t.render_report("File: a.docx", "# Heading").unwrap();
        assert_eq!(out, "Docs:\nFile: a.docx\nStyle:\n# Heading\n");
    }

    #[test]
    fn rendering_is_repeatable() {
        let t = PromptTemplate::new("{example_content}|{master_content}|{master_content}");
        let a = t.render_report("M", "E").unwrap();
        let b = t.render_report("M", "E").unwrap();
        assert_eq!(a, "E|M|M");
        assert_eq!(a, b);
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        let t = PromptTemplate::new("{master_content}");
        assert_eq!(t.render_report("{example_content} }{", "x").unwrap(), "{example_content} }{");
    }

    #[test]
    fn doubled_braces_are_literal() {
        let t = PromptTemplate::new("Return {{\"a\": 1}} for {master_content}");
        assert_eq!(t.render_report("ünïcode", "").unwrap(), "Return {\"a\": 1} for ünïcode");
    }

    #[test]
    fn unknown_field_is_an_error() {
        let err = PromptTemplate::new("{month}").render_report("m", "e").unwrap_err();
        assert!(err.to_string().contains("{month}"), "{err}");
    }

    #[test]
    fn unbalanced_braces_are_errors() {
        assert!(PromptTemplate::new("open {master_content").render_report("", "").is_err());
        assert!(PromptTemplate::new("close }").render_report("", "").is_err());
        assert!(PromptTemplate::new("{}").render_report("", "").is_err());
    }

    #[test]
    fn load_reads_named_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("monthly_status_report.txt"), "{master_content}").unwrap();
        let t = PromptTemplate::load(dir.path(), "monthly_status_report").unwrap();
        assert_eq!(t.text(), "{master_content}");
    }

    #[test]
    fn load_missing_prompt_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = PromptTemplate::load(dir.path(), "weekly").unwrap_err();
        assert_eq!(err.to_string(), "Prompt file 'weekly.txt' not found in the prompts folder.");
    }
}
