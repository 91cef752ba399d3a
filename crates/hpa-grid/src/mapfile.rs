//! Text map format: parsing and rendering.
//!
//! A map file is a header of whitespace-separated key/value lines
//! (`type`, `width`, `height` in any order), a `map` line, then exactly
//! `height` rows of `width` characters where `.` is free and `@` is an
//! obstacle. Blank lines and `#` comments are allowed before `map`.

use std::io::BufRead;

use hpa_core::Point;
use thiserror::Error;

use crate::grid::{GridMap, Topology};

/// Maximum accepted map width (and line length).
pub const MAX_LINE: usize = 2048;

/// Errors reported while reading a map file.
#[derive(Debug, Error)]
pub enum MapError {
    /// Malformed input, with the 1-based line number it was found on.
    #[error("line {line}: {message}")]
    Parse { line: usize, message: &'static str },
    #[error("read error: {0}")]
    Io(#[from] std::io::Error),
}

/// Line-by-line reader that tracks line numbers for error reporting.
struct LineReader<R> {
    input: R,
    line_number: usize,
}

impl<R: BufRead> LineReader<R> {
    fn new(input: R) -> Self {
        Self {
            input,
            line_number: 0,
        }
    }

    fn error(&self, message: &'static str) -> MapError {
        MapError::Parse {
            line: self.line_number,
            message,
        }
    }

    fn read_line(&mut self) -> Result<String, MapError> {
        let mut line = String::new();
        let n = self.input.read_line(&mut line)?;
        self.line_number += 1;
        if n == 0 {
            return Err(self.error("unexpected end of stream"));
        }
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(line)
    }
}

impl GridMap {
    /// Parse a map from a reader.
    pub fn from_reader(input: impl BufRead) -> Result<GridMap, MapError> {
        let mut reader = LineReader::new(input);
        let mut topology = None;
        let mut cols: Option<i32> = None;
        let mut rows: Option<i32> = None;

        loop {
            let line = reader.read_line()?;
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.split_whitespace();
            let attribute = fields.next().ok_or_else(|| reader.error("missing attribute"))?;
            match attribute {
                "type" => {
                    topology = Some(match fields.next() {
                        Some("tile") => Topology::Tile,
                        Some("octile") => Topology::Octile,
                        Some("octile_unicost") => Topology::OctileUnicost,
                        Some("hex") => Topology::Hex,
                        Some(_) => return Err(reader.error("invalid type value")),
                        None => return Err(reader.error("missing type value")),
                    });
                }
                "width" => {
                    let value = fields
                        .next()
                        .and_then(|v| v.parse::<i32>().ok())
                        .filter(|&v| v > 0 && v as usize <= MAX_LINE);
                    cols = Some(value.ok_or_else(|| reader.error("invalid width"))?);
                }
                "height" => {
                    let value = fields
                        .next()
                        .and_then(|v| v.parse::<i32>().ok())
                        .filter(|&v| v > 0);
                    rows = Some(value.ok_or_else(|| reader.error("invalid height"))?);
                }
                "map" => break,
                _ => return Err(reader.error("unknown attribute")),
            }
        }

        let (Some(cols), Some(rows)) = (cols, rows) else {
            return Err(reader.error("map without valid width / height"));
        };
        let Some(topology) = topology else {
            return Err(reader.error("map without type"));
        };

        log::debug!("loading {cols}x{rows} {topology:?} map");
        let mut grid = GridMap::new(topology, rows, cols);
        for y in 0..rows {
            let line = reader.read_line()?;
            let mut chars = line.chars();
            for x in 0..cols {
                match chars.next() {
                    Some('@') => grid.set_obstacle(Point::new(x, y), true),
                    Some('.') => {}
                    Some(_) => return Err(reader.error("unknown character")),
                    None => return Err(reader.error("unexpected end of stream")),
                }
            }
            if chars.next().is_some() {
                return Err(reader.error("row longer than declared width"));
            }
        }
        Ok(grid)
    }

    // -----------------------------------------------------------------------
    // Rendering
    // -----------------------------------------------------------------------

    fn char_vector(&self) -> Vec<u8> {
        (0..self.num_nodes_raw())
            .map(|id| if self.is_obstacle_id(id) { b'@' } else { b'.' })
            .collect()
    }

    fn num_nodes_raw(&self) -> usize {
        (self.rows() * self.cols()) as usize
    }

    fn render_chars(&self, chars: &[u8]) -> String {
        let cols = self.cols() as usize;
        let mut out = String::with_capacity(chars.len() + self.rows() as usize);
        for row in chars.chunks(cols) {
            out.push_str(std::str::from_utf8(row).expect("map characters are ascii"));
            out.push('\n');
        }
        out
    }

    /// Render the map in its file format (without the header).
    pub fn render(&self) -> String {
        self.render_chars(&self.char_vector())
    }

    /// Render the map with a path overlay: `S` start, `T` target, `x`
    /// between. The path is in start→target order.
    pub fn render_with_path(&self, path: &[usize]) -> String {
        let mut chars = self.char_vector();
        if !path.is_empty() {
            for &id in path {
                chars[id] = b'x';
            }
            chars[path[0]] = b'S';
            chars[*path.last().expect("non-empty path")] = b'T';
        }
        self.render_chars(&chars)
    }

    /// Render the map with per-cell labels (e.g. a visited-node trace);
    /// space labels leave the underlying cell visible.
    pub fn render_with_labels(&self, labels: &[u8]) -> String {
        assert_eq!(
            labels.len(),
            self.num_nodes_raw(),
            "label vector does not match grid size"
        );
        let mut chars = self.char_vector();
        for (c, &label) in chars.iter_mut().zip(labels) {
            if label != b' ' {
                *c = label;
            }
        }
        self.render_chars(&chars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(text: &str) -> Result<GridMap, MapError> {
        GridMap::from_reader(Cursor::new(text))
    }

    #[test]
    fn parses_simple_map() {
        let grid = parse("type octile\nwidth 3\nheight 2\nmap\n.@.\n...\n").unwrap();
        assert_eq!(grid.topology(), Topology::Octile);
        assert_eq!(grid.cols(), 3);
        assert_eq!(grid.rows(), 2);
        assert!(grid.is_obstacle(Point::new(1, 0)));
        assert!(!grid.is_obstacle(Point::new(1, 1)));
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let grid = parse("# a map\n\ntype tile\nwidth 1\nheight 1\nmap\n.\n").unwrap();
        assert_eq!(grid.topology(), Topology::Tile);
    }

    #[test]
    fn reports_unknown_attribute_with_line() {
        let err = parse("type tile\nbogus 3\n").unwrap_err();
        match err {
            MapError::Parse { line, message } => {
                assert_eq!(line, 2);
                assert_eq!(message, "unknown attribute");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn reports_unknown_character_with_line() {
        let err = parse("type tile\nwidth 2\nheight 1\nmap\n.#\n").unwrap_err();
        match err {
            MapError::Parse { line, message } => {
                assert_eq!(line, 5);
                assert_eq!(message, "unknown character");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn reports_truncated_rows() {
        let err = parse("type tile\nwidth 3\nheight 2\nmap\n...\n").unwrap_err();
        assert!(matches!(err, MapError::Parse { line: 6, .. }));
    }

    #[test]
    fn rejects_missing_type() {
        let err = parse("width 2\nheight 2\nmap\n").unwrap_err();
        assert!(matches!(
            err,
            MapError::Parse {
                message: "map without type",
                ..
            }
        ));
    }

    #[test]
    fn render_round_trips() {
        let text = "type octile\nwidth 4\nheight 3\nmap\n.@..\n....\n..@.\n";
        let grid = parse(text).unwrap();
        assert_eq!(grid.render(), ".@..\n....\n..@.\n");
    }

    #[test]
    fn render_path_overlay() {
        let grid = parse("type tile\nwidth 3\nheight 1\nmap\n...\n").unwrap();
        let rendered = grid.render_with_path(&[0, 1, 2]);
        assert_eq!(rendered, "SxT\n");
    }
}
