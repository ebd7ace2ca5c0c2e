use super::error::{BpgnError, Result, SourcePos};
use super::movetext::{has_result_marker, parse_movetext};
use super::types::Game;

use regex::Regex;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static TAG_PAIR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\[(.*?) "(.*?)"\]"#).expect("valid tag pair regex"));

/// Line source with one line of lookahead.
///
/// Lines are handed out with trailing whitespace removed, so a blank line is
/// an empty string and end of input is `None`.
pub struct LineReader<R> {
    inner: R,
    path: PathBuf,
    peeked: Option<Option<String>>,
    line: usize,
    buf: Vec<u8>,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(inner: R, path: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            path: path.into(),
            peeked: None,
            line: 0,
            buf: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Position of the most recently consumed line (1-based).
    pub fn pos(&self) -> SourcePos {
        SourcePos::new(&self.path, self.line)
    }

    fn fetch(&mut self) -> Result<Option<String>> {
        self.buf.clear();
        let n = self
            .inner
            .read_until(b'\n', &mut self.buf)
            .map_err(|e| BpgnError::io(&self.path, e))?;
        if n == 0 {
            return Ok(None);
        }

        let line = String::from_utf8_lossy(&self.buf);
        Ok(Some(line.trim_end().to_string()))
    }

    /// Look at the next line without consuming it.
    pub fn peek(&mut self) -> Result<Option<&str>> {
        if self.peeked.is_none() {
            let line = self.fetch()?;
            self.peeked = Some(line);
        }
        Ok(self.peeked.as_ref().and_then(|line| line.as_deref()))
    }

    /// Consume the next line.
    pub fn read(&mut self) -> Result<Option<String>> {
        let line = match self.peeked.take() {
            Some(line) => line,
            None => self.fetch()?,
        };
        if line.is_some() {
            self.line += 1;
        }
        Ok(line)
    }

    /// Skip blank lines; `false` once the input is exhausted.
    pub fn skip_blank_lines(&mut self) -> Result<bool> {
        loop {
            match self.peek()?.map(str::is_empty) {
                None => return Ok(false),
                Some(true) => {
                    self.read()?;
                }
                Some(false) => return Ok(true),
            }
        }
    }

    /// Consume the next line if it is a bare `{comment}` line.
    fn take_comment_line(&mut self) -> Result<Option<String>> {
        let Some(comment) = self.peek()?.and_then(bare_comment).map(str::to_string) else {
            return Ok(None);
        };
        self.read()?;
        Ok(Some(comment))
    }
}

/// The text inside a line of the form `{...}`.
fn bare_comment(line: &str) -> Option<&str> {
    line.strip_prefix('{')?.strip_suffix('}')
}

fn extract_tags(line: &str, game: &mut Game) {
    for cap in TAG_PAIR_RE.captures_iter(line) {
        game.tags.insert(cap[1].to_string(), cap[2].to_string());
    }
}

/// Collect `{comment}` lines, skipping blank lines between them.
///
/// Returns `false` if the input ran out.
fn collect_comment_lines<R: BufRead>(
    reader: &mut LineReader<R>,
    comments: &mut Vec<String>,
) -> Result<bool> {
    loop {
        if !reader.skip_blank_lines()? {
            return Ok(false);
        }
        match reader.take_comment_line()? {
            Some(comment) => comments.push(comment),
            None => return Ok(true),
        }
    }
}

/// Assemble the next game from `reader`.
///
/// Returns `Ok(None)` when only blank lines are left.
pub fn read_game<R: BufRead>(
    reader: &mut LineReader<R>,
    initial_state: &str,
) -> Result<Option<Game>> {
    if !reader.skip_blank_lines()? {
        return Ok(None);
    }

    let mut game = Game::new(initial_state);

    let first = reader.read()?.unwrap_or_default();
    if !first.starts_with("[Event") {
        return Err(BpgnError::MissingEventTag(reader.pos()));
    }
    extract_tags(&first, &mut game);

    while reader.peek()?.is_some_and(|line| line.starts_with('[')) {
        if let Some(line) = reader.read()? {
            extract_tags(&line, &mut game);
        }
    }

    if !collect_comment_lines(reader, &mut game.comments)? {
        return Err(BpgnError::MissingMovetext(reader.pos()));
    }

    // Continuation lines are joined verbatim, up to a blank line or EOF.
    let mut movetext = reader.read()?.unwrap_or_default();
    while reader.peek()?.is_some_and(|line| !line.is_empty()) {
        if let Some(line) = reader.read()? {
            movetext.push_str(&line);
        }
    }

    let pos = reader.pos();
    if !has_result_marker(&movetext) {
        return Err(BpgnError::MissingMovetext(pos));
    }

    parse_movetext(&movetext, &mut game, &pos)?;

    collect_comment_lines(reader, &mut game.comments)?;

    tracing::trace!(
        source = %pos,
        moves = game.moves.len(),
        "assembled game"
    );

    Ok(Some(game))
}
