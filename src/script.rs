//! Line-oriented replay scripts for driving a canvas session headlessly.
//!
//! ```text
//! # comment
//! tool rectangle
//! color primary #FF0000
//! press 1 1
//! drag 4 4
//! release 8 6
//! stroke 0 0 5 0 5 5
//! text 2 2 14 Hello\nworld
//! undo
//! redo
//! ```

use log::debug;

use crate::color::{Color, parse_color};
use crate::error::ScriptError;
use crate::session::CanvasSession;
use crate::tools::ToolChoice;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorSlot {
    Primary,
    Secondary,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Op {
    Tool(ToolChoice),
    Color(ColorSlot, Color),
    Press(i32, i32),
    Drag(i32, i32),
    Release(i32, i32),
    /// Press at the first point, drag through the rest, release at the last.
    Stroke(Vec<(i32, i32)>),
    Text { x: i32, y: i32, size: f32, text: String },
    Undo,
    Redo,
}

/// Split off the first whitespace-delimited token.
fn next_token(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    if s.is_empty() {
        return None;
    }
    let end = s.find(char::is_whitespace).unwrap_or(s.len());
    Some((&s[..end], &s[end..]))
}

struct Args<'a> {
    line: usize,
    op: &'a str,
    rest: &'a str,
}

impl<'a> Args<'a> {
    fn bad(&self, message: impl Into<String>) -> ScriptError {
        ScriptError::BadArguments {
            line: self.line,
            message: format!("{}: {}", self.op, message.into()),
        }
    }

    fn word(&mut self, what: &str) -> Result<&'a str, ScriptError> {
        let (tok, rest) = next_token(self.rest).ok_or_else(|| self.bad(format!("missing {}", what)))?;
        self.rest = rest;
        Ok(tok)
    }

    fn int(&mut self, what: &str) -> Result<i32, ScriptError> {
        let tok = self.word(what)?;
        tok.parse().map_err(|_| self.bad(format!("{} `{}` is not an integer", what, tok)))
    }

    fn point(&mut self) -> Result<(i32, i32), ScriptError> {
        Ok((self.int("x")?, self.int("y")?))
    }

    fn finish(&self) -> Result<(), ScriptError> {
        match next_token(self.rest) {
            Some((extra, _)) => Err(self.bad(format!("unexpected argument `{}`", extra))),
            None => Ok(()),
        }
    }
}

/// Parse a whole script. Errors name the 1-based line.
pub fn parse_script(src: &str) -> Result<Vec<Op>, ScriptError> {
    let mut ops = Vec::new();
    for (idx, raw) in src.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(op) = parse_line(idx + 1, line)? {
            ops.push(op);
        }
    }
    Ok(ops)
}

fn parse_line(line_no: usize, line: &str) -> Result<Option<Op>, ScriptError> {
    let Some((op, rest)) = next_token(line) else {
        return Ok(None);
    };
    let mut args = Args { line: line_no, op, rest };

    let parsed = match op.to_ascii_lowercase().as_str() {
        "tool" => {
            let name = args.word("tool name")?;
            let choice = name.parse::<ToolChoice>().map_err(|e| args.bad(e))?;
            args.finish()?;
            Op::Tool(choice)
        }
        "color" => {
            let slot = match args.word("slot")?.to_ascii_lowercase().as_str() {
                "primary" => ColorSlot::Primary,
                "secondary" => ColorSlot::Secondary,
                other => return Err(args.bad(format!("slot must be primary or secondary, got `{}`", other))),
            };
            let color = parse_color(args.word("color")?).map_err(|e| args.bad(e.to_string()))?;
            args.finish()?;
            Op::Color(slot, color)
        }
        "press" | "drag" | "release" => {
            let (x, y) = args.point()?;
            args.finish()?;
            match op.to_ascii_lowercase().as_str() {
                "press" => Op::Press(x, y),
                "drag" => Op::Drag(x, y),
                _ => Op::Release(x, y),
            }
        }
        "stroke" => {
            let mut points = vec![args.point()?];
            while next_token(args.rest).is_some() {
                points.push(args.point()?);
            }
            Op::Stroke(points)
        }
        "text" => {
            let (x, y) = args.point()?;
            let size_tok = args.word("size")?;
            let size: f32 = size_tok
                .parse()
                .map_err(|_| args.bad(format!("size `{}` is not a number", size_tok)))?;
            let text = args.rest.trim().replace("\\n", "\n");
            if text.is_empty() {
                return Err(args.bad("missing text"));
            }
            Op::Text { x, y, size, text }
        }
        "undo" => {
            args.finish()?;
            Op::Undo
        }
        "redo" => {
            args.finish()?;
            Op::Redo
        }
        _ => {
            return Err(ScriptError::UnknownOp {
                line: line_no,
                op: op.to_string(),
            });
        }
    };
    Ok(Some(parsed))
}

/// Counters from one replay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub ops: usize,
    pub undos: usize,
    pub redos: usize,
}

/// Feed parsed ops into a session. An unfinished press is released at its
/// last position when the script ends.
pub fn replay(session: &mut CanvasSession, ops: &[Op]) -> ReplayStats {
    let mut stats = ReplayStats::default();
    let mut last = None;
    for op in ops {
        debug!("Replay {:?}", op);
        match op {
            Op::Tool(choice) => session.select_tool(*choice),
            Op::Color(ColorSlot::Primary, c) => session.set_primary_color(*c),
            Op::Color(ColorSlot::Secondary, c) => session.set_secondary_color(*c),
            Op::Press(x, y) => {
                session.press(*x, *y);
                last = Some((*x, *y));
            }
            Op::Drag(x, y) => {
                session.drag(*x, *y);
                last = Some((*x, *y));
            }
            Op::Release(x, y) => {
                session.release(*x, *y);
                last = None;
            }
            Op::Stroke(points) => {
                if let (Some(&(x0, y0)), Some(&(xn, yn))) = (points.first(), points.last()) {
                    session.press(x0, y0);
                    for &(x, y) in &points[1..] {
                        session.drag(x, y);
                    }
                    session.release(xn, yn);
                }
                last = None;
            }
            Op::Text { x, y, size, text } => {
                session.commit_text(*x, *y, text, *size);
            }
            Op::Undo => {
                if session.undo() {
                    stats.undos += 1;
                }
            }
            Op::Redo => {
                if session.redo() {
                    stats.redos += 1;
                }
            }
        }
        stats.ops += 1;
    }
    if let (true, Some((x, y))) = (session.is_session_active(), last) {
        session.release(x, y);
    }
    session.finish_rendering();
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{BLUE, RED};

    #[test]
    fn parses_every_op() {
        let ops = parse_script(
            "# setup\n\
             tool Rect\n\
             color primary red\n\
             color SECONDARY #0000FF\n\
             \n\
             press 1 2\n\
             drag -3 4\n\
             release 5 6\n\
             stroke 0 0 5 0 5 5\n\
             text 1 1 14   Hello  world\\nbye\n\
             undo\n\
             redo\n",
        )
        .unwrap();
        assert_eq!(
            ops,
            vec![
                Op::Tool(ToolChoice::Rectangle),
                Op::Color(ColorSlot::Primary, RED),
                Op::Color(ColorSlot::Secondary, BLUE),
                Op::Press(1, 2),
                Op::Drag(-3, 4),
                Op::Release(5, 6),
                Op::Stroke(vec![(0, 0), (5, 0), (5, 5)]),
                Op::Text { x: 1, y: 1, size: 14.0, text: "Hello  world\nbye".to_string() },
                Op::Undo,
                Op::Redo,
            ]
        );
    }

    #[test]
    fn errors_carry_line_numbers() {
        assert_eq!(
            parse_script("undo\n\nsmudge 1 2"),
            Err(ScriptError::UnknownOp { line: 3, op: "smudge".to_string() })
        );
        for (src, line) in [
            ("press 1", 1),
            ("undo\npress 1 x", 2),
            ("# c\n# c\nstroke 1 2 3", 3),
            ("color tertiary red", 1),
            ("color primary mauve", 1),
            ("tool airbrush", 1),
            ("redo now", 1),
            ("text 1 1 12", 1),
        ] {
            match parse_script(src) {
                Err(ScriptError::BadArguments { line: l, .. }) => assert_eq!(l, line, "{src:?}"),
                other => panic!("{src:?} gave {other:?}"),
            }
        }
    }
}
