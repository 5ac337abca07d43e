//! Parser for the text form of method bodies.
//!
//! ```text
//! ; comments run to the end of the line
//! exception java.io.IOException    ; optional, fixes the type's number
//! start:                            ; labels name the next instruction
//!   invoke
//!   move-result
//!   goto done
//! handler:
//!   move-exception
//!   throw
//! done:
//!   return
//! trap start handler java.io.IOException handler
//! ```
//!
//! Instruction positions in `goto` and `trap` are either labels or plain
//! instruction numbers.  A label may also sit after the last instruction, to
//! name the end of the body.  Traps are declared in priority order.

use rustc_hash::FxHashMap;

use std::fs::File;
use std::io;
use std::io::prelude::*;
use std::iter::Peekable;
use std::path::PathBuf;
use std::str::CharIndices;

use trapsplit::InstIx;

use crate::test_framework::*;

#[derive(Debug)]
pub enum ParseError {
  IoError(io::Error),
  Parse(String),
}

impl From<io::Error> for ParseError {
  fn from(err: io::Error) -> ParseError {
    ParseError::IoError(err)
  }
}

pub type ParseResult<T> = Result<T, ParseError>;

pub fn parse_file(path: PathBuf) -> ParseResult<Body> {
  let basename = match path.file_stem().and_then(|stem| stem.to_str()) {
    Some(stem) => stem.to_string(),
    None => return Err(ParseError::Parse("bad file name".into())),
  };
  let mut file = File::open(path)?;
  let mut content = String::new();
  file.read_to_string(&mut content)?;
  parse_content(&basename, &content)
}

/// A position operand whose label may not be defined yet.
enum Pos {
  Label(String),
  Number(u32),
}

struct PendingTrap {
  begin: Pos,
  end: Pos,
  exn: ExnType,
  handler: Pos,
  line: usize,
}

struct Parser<'b, 'str> {
  body: &'b mut Body,
  labels: FxHashMap<String, InstIx>,
  gotos: Vec<(InstIx, Pos, usize)>,
  traps: Vec<PendingTrap>,

  source: &'str str,
  iter: Peekable<CharIndices<'str>>,
  line: usize,
  start: usize,
  current: usize,
}

impl<'b, 'str> Parser<'b, 'str> {
  fn new(body: &'b mut Body, source: &'str str) -> Self {
    let iter = source.char_indices().peekable();
    Self {
      body,
      labels: FxHashMap::default(),
      gotos: Vec::new(),
      traps: Vec::new(),
      source,
      iter,
      line: 1,
      start: 0,
      current: 0,
    }
  }

  // Environment.
  fn define_label(&mut self, name: String) -> ParseResult<()> {
    let here = InstIx::new(self.body.insts.len());
    if self.labels.insert(name, here).is_some() {
      self.error("duplicate label")
    } else {
      Ok(())
    }
  }

  fn resolve(&self, pos: &Pos, line: usize) -> ParseResult<InstIx> {
    match pos {
      Pos::Number(n) => Ok(InstIx::new(*n)),
      Pos::Label(name) => match self.labels.get(name) {
        Some(ix) => Ok(*ix),
        None => Err(ParseError::Parse(format!(
          "error at line {}: undefined label '{}'",
          line, name
        ))),
      },
    }
  }

  // Parsing.
  fn peek(&mut self) -> Option<char> {
    self.iter.peek().map(|&(_, c)| c)
  }

  fn advance(&mut self) -> Option<char> {
    if let Some((i, ch)) = self.iter.next() {
      self.current = i;
      Some(ch)
    } else {
      None
    }
  }

  // Higher level parsing.
  fn skip_whitespace_and_comments(&mut self) {
    while let Some(c) = self.peek() {
      if c == ' ' || c == '\t' || c == '\r' || c == '\n' {
        self.advance();
        if c == '\n' {
          self.line += 1;
        }
      } else if c == ';' {
        // It's a comment! skip until the end of line.
        self.advance();
        while let Some(c) = self.advance() {
          if c == '\n' {
            self.line += 1;
            break;
          }
        }
      } else {
        break;
      }
    }
  }

  fn try_read_char(&mut self, expected: char) -> Option<char> {
    self.skip_whitespace_and_comments();
    if self.peek() == Some(expected) {
      return self.advance();
    }
    None
  }

  fn try_read_ident(&mut self) -> Option<String> {
    self.skip_whitespace_and_comments();
    match self.peek() {
      Some(c) if is_alpha(c) => {}
      _ => return None,
    }
    self.advance();
    self.start = self.current;
    while let Some(c) = self.peek() {
      if !is_ident_char(c) {
        break;
      }
      self.advance();
    }
    let last_len =
      self.source[self.current..].chars().next().map_or(0, char::len_utf8);
    Some(self.source[self.start..self.current + last_len].to_string())
  }

  fn read_ident(&mut self) -> ParseResult<String> {
    if let Some(string) = self.try_read_ident() {
      Ok(string)
    } else {
      self.error("expected identifier or keyword")
    }
  }

  fn try_read_int(&mut self) -> ParseResult<Option<u32>> {
    self.skip_whitespace_and_comments();
    let mut value: Option<u32> = None;
    while let Some(c) = self.peek() {
      let digit = match c.to_digit(10) {
        Some(digit) => digit,
        None => break,
      };
      self.advance();
      let so_far = value.unwrap_or(0);
      match so_far.checked_mul(10).and_then(|v| v.checked_add(digit)) {
        Some(v) => value = Some(v),
        None => return self.error("integer too large"),
      }
    }
    if let Some(c) = self.peek() {
      if value.is_some() && is_alpha(c) {
        return self.error("unexpected character after number");
      }
    }
    Ok(value)
  }

  fn read_pos(&mut self) -> ParseResult<Pos> {
    if let Some(n) = self.try_read_int()? {
      Ok(Pos::Number(n))
    } else if let Some(label) = self.try_read_ident() {
      Ok(Pos::Label(label))
    } else {
      self.error("expected a label or an instruction number")
    }
  }

  fn is_done(&mut self) -> bool {
    self.skip_whitespace_and_comments();
    self.peek().is_none()
  }

  fn error<T>(&self, msg: &str) -> ParseResult<T> {
    Err(ParseError::Parse(format!("error at line {}: {}", self.line, msg)))
  }
}

pub fn parse_content(body_name: &str, content: &str) -> ParseResult<Body> {
  let mut body = Body::new(body_name);
  let mut parser = Parser::new(&mut body, content);

  while !parser.is_done() {
    let word = parser.read_ident()?;
    let inst = match word.as_str() {
      "nop" => i_nop(),
      "invoke" => i_invoke(),
      "move-result" => i_move_result(),
      "move-exception" => i_move_exception(),
      "throw" => i_throw(),
      "return" => i_return(),

      "goto" => {
        let line = parser.line;
        let target = parser.read_pos()?;
        let at = parser.body.push(i_goto(0));
        parser.gotos.push((at, target, line));
        continue;
      }

      "exception" => {
        let name = parser.read_ident()?;
        parser.body.exn(&name);
        continue;
      }

      "trap" => {
        let line = parser.line;
        let begin = parser.read_pos()?;
        let end = parser.read_pos()?;
        let exn_name = parser.read_ident()?;
        let exn = parser.body.exn(&exn_name);
        let handler = parser.read_pos()?;
        parser.traps.push(PendingTrap { begin, end, exn, handler, line });
        continue;
      }

      _ => {
        if parser.try_read_char(':').is_none() {
          return parser.error(&format!("unknown instruction '{}'", word));
        }
        parser.define_label(word)?;
        continue;
      }
    };
    parser.body.push(inst);
  }

  // Labels are known now; patch up forward references.
  let mut gotos = Vec::new();
  for (at, target, line) in &parser.gotos {
    gotos.push((*at, parser.resolve(target, *line)?));
  }
  let mut traps = Vec::new();
  for t in &parser.traps {
    traps.push((
      parser.resolve(&t.begin, t.line)?,
      parser.resolve(&t.end, t.line)?,
      t.exn,
      parser.resolve(&t.handler, t.line)?,
    ));
  }

  for (at, target) in gotos {
    body.insts[at] = Inst::Goto { target };
  }
  for (begin, end, exn, handler) in traps {
    body.trap(begin.get(), end.get(), exn, handler.get());
  }
  Ok(body)
}

fn is_digit(c: char) -> bool {
  c >= '0' && c <= '9'
}

fn is_alpha(c: char) -> bool {
  c >= 'a' && c <= 'z' || c >= 'A' && c <= 'Z' || c == '_' || c == '$'
}

fn is_ident_char(c: char) -> bool {
  is_digit(c) || is_alpha(c) || c == '-' || c == '.' || c == '/'
}

#[cfg(test)]
mod test {
  use super::*;

  fn parse(content: &str) -> Body {
    match parse_content("test", content) {
      Ok(body) => body,
      Err(err) => panic!("parse failed: {:?}", err),
    }
  }

  fn parse_err(content: &str) -> String {
    match parse_content("test", content) {
      Err(ParseError::Parse(msg)) => msg,
      other => panic!("expected a parse error, got {:?}", other.map(|_| ())),
    }
  }

  #[test]
  fn test_labels_and_traps() {
    let body = parse(
      "
      exception Ljava/lang/Throwable;   ; semicolon starts a comment
      start:
        invoke
        move-result
        goto done
      handler:
        move-exception
        throw
      done:
        return
      end:
      trap start handler java.io.IOException handler
      trap 0 end Ljava/lang/Throwable 3
      ",
    );
    assert_eq!(body.insts.len(), 6);
    assert_eq!(body.insts[InstIx::new(2)], Inst::Goto { target: InstIx::new(5) });
    assert_eq!(body.exn_names, vec!["Ljava/lang/Throwable", "java.io.IOException"]);
    assert_eq!(body.traps.len(), 2);
    let t = &body.traps[0];
    assert_eq!((t.begin.get(), t.end.get(), t.handler.get()), (0, 3, 3));
    assert_eq!(body.exn_name(t.exception), "java.io.IOException");
    assert_eq!(body.traps[1].end, InstIx::new(6));
  }

  #[test]
  fn test_render_parses_back() {
    let body = parse(
      "a: invoke move-result goto a nop return
       trap 0 4 E 3 trap 1 2 F 4",
    );
    let mut rendered = String::new();
    body.render("body", &mut rendered).unwrap();
    let reparsed = parse(&rendered);
    let mut rerendered = String::new();
    reparsed.render("body", &mut rerendered).unwrap();
    assert_eq!(rendered, rerendered);
    assert_eq!(reparsed.traps, body.traps);
  }

  #[test]
  fn test_errors() {
    assert_eq!(parse_err("nop\nfrob"), "error at line 2: unknown instruction 'frob'");
    assert!(parse_err("a: a: return").contains("duplicate label"));
    assert!(parse_err("goto nowhere").contains("undefined label 'nowhere'"));
    assert!(parse_err("trap 0").contains("expected a label"));
    assert!(parse_err("goto 99999999999").contains("too large"));
    assert!(parse_err("goto 12ab").contains("after number"));
  }
}
