//! Printers: colored status lines and markdown (termimad).

use owo_colors::OwoColorize;
use termimad::MadSkin;

#[derive(Debug, Clone, Copy)]
pub enum Tone {
    Success,
    Info,
}

pub struct TextPrinter {
    pub tone: Tone,
}

impl TextPrinter {
    pub fn new(tone: Tone) -> Self {
        Self { tone }
    }

    pub fn print(&self, text: &str) {
        match self.tone {
            Tone::Success => println!("{}", text.green()),
            Tone::Info => println!("{}", text.cyan()),
        }
    }
}

pub struct MarkdownPrinter {
    pub skin: MadSkin,
}

impl Default for MarkdownPrinter {
    fn default() -> Self {
        Self { skin: MadSkin::default() }
    }
}

impl MarkdownPrinter {
    pub fn print(&self, text: &str) {
        self.skin.print_text(text);
        println!();
    }
}
