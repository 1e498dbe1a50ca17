//! Terminal display.
//!
//! Options: `align={left,right,center}`, `separator="…"`, `no-color`.

use std::io::{self, Write};

use crossterm::style::{Color, ResetColor, SetForegroundColor};
use statbar_core::markup;
use statbar_core::options::{OptionSpec, option_line};
use statbar_items::Item;
use statbar_process::RunContext;

use crate::{Display, DisplayError};

const OPTIONS: &[OptionSpec] = &[
    OptionSpec { name: "align", code: 'a' },
    OptionSpec { name: "separator", code: 's' },
    OptionSpec { name: "no-color", code: 'c' },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Alignment {
    Left,
    Right,
    Centre,
}

pub struct StandardDisplay {
    separator: String,
    alignment: Alignment,
    color: bool,
}

impl Default for StandardDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl StandardDisplay {
    #[must_use]
    pub fn new() -> Self {
        Self { separator: " | ".to_owned(), alignment: Alignment::Centre, color: true }
    }

    /// Render one refresh into a byte buffer.
    fn render(&self, items: &[Item]) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();

        for (index, item) in items.iter().enumerate() {
            if index > 0 {
                out.extend_from_slice(self.separator.as_bytes());
            }

            let width = markup::visible_width(item.text(), false);
            let mut padding = item.min_width().saturating_sub(width);

            match self.alignment {
                Alignment::Centre => {
                    pad(&mut out, padding / 2);
                    padding -= padding / 2;
                }
                Alignment::Right => {
                    pad(&mut out, padding);
                    padding = 0;
                }
                Alignment::Left => {}
            }

            for span in markup::tokens(item.text(), false) {
                match span.color.filter(|_| self.color) {
                    Some(color) => {
                        crossterm::queue!(
                            out,
                            SetForegroundColor(Color::Rgb {
                                r: color.red(),
                                g: color.green(),
                                b: color.blue(),
                            })
                        )?;
                        out.extend_from_slice(span.text.as_bytes());
                        crossterm::queue!(out, ResetColor)?;
                    }
                    None => out.extend_from_slice(span.text.as_bytes()),
                }
            }

            pad(&mut out, padding);
        }

        out.push(b'\n');
        Ok(out)
    }
}

fn pad(out: &mut Vec<u8>, columns: usize) {
    out.extend(std::iter::repeat_n(b' ', columns));
}

impl Display for StandardDisplay {
    fn set(&mut self, line: &str) {
        for (code, value) in option_line(line, OPTIONS) {
            match code {
                'a' => match value.chars().next() {
                    Some('l' | 'L') => self.alignment = Alignment::Left,
                    Some('r' | 'R') => self.alignment = Alignment::Right,
                    Some('c' | 'C') => self.alignment = Alignment::Centre,
                    _ => {}
                },
                's' => self.separator = value.to_owned(),
                'c' => self.color = false,
                _ => {}
            }
        }
    }

    fn update_items(&mut self, items: &[Item], _run: &mut RunContext) -> Result<(), DisplayError> {
        let line = self.render(items)?;
        let mut stdout = io::stdout().lock();
        stdout.write_all(&line)?;
        stdout.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use statbar_items::item::{Driver, Item, ItemBody, ItemError, UpdateContext};
    use std::time::Duration;

    struct Fixed;
    impl Driver for Fixed {
        fn update(
            &mut self,
            _body: &mut ItemBody,
            _cx: &mut UpdateContext<'_>,
        ) -> Result<Option<Duration>, ItemError> {
            Ok(None)
        }
    }

    fn item(text: &str, min_width: usize) -> Item {
        let mut item = Item::new(Box::new(Fixed));
        item.body.text = text.to_owned();
        item.body.min_width = min_width;
        item
    }

    fn rendered(display: &StandardDisplay, items: &[Item]) -> String {
        String::from_utf8(display.render(items).unwrap()).unwrap()
    }

    #[test]
    fn items_are_joined_by_the_separator() {
        let display = StandardDisplay::new();
        assert_eq!(rendered(&display, &[item("a", 0), item("b", 0)]), "a | b\n");
    }

    #[test]
    fn centre_alignment_splits_the_padding() {
        let display = StandardDisplay::new();
        assert_eq!(rendered(&display, &[item("ab", 5)]), " ab  \n");
    }

    #[test]
    fn left_and_right_alignment() {
        let mut display = StandardDisplay::new();
        display.set("align=left");
        assert_eq!(rendered(&display, &[item("ab", 4)]), "ab  \n");
        display.set("align=right");
        assert_eq!(rendered(&display, &[item("ab", 4)]), "  ab\n");
    }

    #[test]
    fn padding_measures_visible_width_not_markup() {
        let mut display = StandardDisplay::new();
        display.set("no-color");
        assert_eq!(rendered(&display, &[item("{ff0000}ab{}", 4)]), " ab \n");
    }

    #[test]
    fn colors_become_rgb_escapes() {
        let display = StandardDisplay::new();
        let line = rendered(&display, &[item("{ff0000}hot{}", 0)]);
        assert!(line.contains("\x1b["), "no escape sequence in {line:?}");
        assert!(line.contains("hot"));
    }

    #[test]
    fn no_color_strips_the_escapes() {
        let mut display = StandardDisplay::new();
        display.set("no-color");
        assert_eq!(rendered(&display, &[item("{ff0000}hot{}", 0)]), "hot\n");
    }

    #[test]
    fn custom_separator() {
        let mut display = StandardDisplay::new();
        display.set("separator=\" :: \"");
        assert_eq!(rendered(&display, &[item("a", 0), item("b", 0)]), "a :: b\n");
    }
}
