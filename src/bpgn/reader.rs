use super::assemble::{LineReader, read_game};
use super::error::{BpgnError, Result};
use super::types::Game;

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use zstd::stream::read::Decoder as ZstdDecoder;

pub const PLAIN_SUFFIX: &str = ".bpgn";
pub const ZSTD_SUFFIX: &str = ".bpgn.zst";

type GameInput = Box<dyn BufRead>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CompressionMode {
    Plain,
    Zstd,
}

impl CompressionMode {
    pub fn parse(raw: &str) -> Result<Self> {
        let normalized = raw.trim();
        if normalized.eq_ignore_ascii_case("zstd") {
            Ok(Self::Zstd)
        } else if normalized.eq_ignore_ascii_case("plain") || normalized.eq_ignore_ascii_case("none")
        {
            Ok(Self::Plain)
        } else {
            Err(BpgnError::InvalidCompression(normalized.to_string()))
        }
    }

    /// Compression implied by a game file's name, `None` for non-game files.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if name.ends_with(ZSTD_SUFFIX) {
            Some(Self::Zstd)
        } else if name.ends_with(PLAIN_SUFFIX) {
            Some(Self::Plain)
        } else {
            None
        }
    }
}

/// How game files are opened and seeded.
#[derive(Clone, Debug)]
pub struct ReadOptions {
    /// Opaque state every game starts from.
    pub initial_state: String,
    /// Forces a decoder; `None` picks one from each file's extension.
    pub compression: Option<CompressionMode>,
}

impl ReadOptions {
    pub fn new(initial_state: impl Into<String>) -> Self {
        Self {
            initial_state: initial_state.into(),
            compression: None,
        }
    }

    pub fn with_compression(mut self, compression: CompressionMode) -> Self {
        self.compression = Some(compression);
        self
    }
}

fn open_input_stream(path: &Path, compression: CompressionMode) -> Result<GameInput> {
    let file = File::open(path).map_err(|e| BpgnError::io(path, e))?;

    match compression {
        CompressionMode::Plain => Ok(Box::new(BufReader::new(file))),
        CompressionMode::Zstd => ZstdDecoder::new(file)
            .map(|decoder| Box::new(BufReader::new(decoder)) as GameInput)
            .map_err(|e| BpgnError::io(path, e)),
    }
}

/// Games of a single file, read lazily one record per `next()`.
pub struct FileGames {
    path: PathBuf,
    compression: CompressionMode,
    initial_state: String,
    reader: LineReader<GameInput>,
}

impl FileGames {
    pub fn open(path: impl Into<PathBuf>, options: &ReadOptions) -> Result<Self> {
        let path = path.into();
        let compression = options
            .compression
            .or_else(|| CompressionMode::from_path(&path))
            .unwrap_or(CompressionMode::Plain);

        let reader = LineReader::new(open_input_stream(&path, compression)?, &path);
        tracing::debug!(path = %path.display(), ?compression, "opened game file");

        Ok(Self {
            path,
            compression,
            initial_state: options.initial_state.clone(),
            reader,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Start over from the first game of the file.
    pub fn rewind(&mut self) -> Result<()> {
        let input = open_input_stream(&self.path, self.compression)?;
        self.reader = LineReader::new(input, &self.path);
        Ok(())
    }
}

impl Iterator for FileGames {
    type Item = Result<Game>;

    fn next(&mut self) -> Option<Self::Item> {
        read_game(&mut self.reader, &self.initial_state).transpose()
    }
}

/// Games of every game file below a directory.
///
/// The walk is driven one directory at a time: an active file is drained
/// first, then the next queued file is opened, and only when the queue is
/// empty is another directory listed.
pub struct DirectoryGames {
    options: ReadOptions,
    dirs: Vec<PathBuf>,
    pending: VecDeque<PathBuf>,
    active: Option<FileGames>,
}

impl DirectoryGames {
    pub fn new(root: impl Into<PathBuf>, options: ReadOptions) -> Self {
        Self {
            options,
            dirs: vec![root.into()],
            pending: VecDeque::new(),
            active: None,
        }
    }

    /// List the next directory of the walk; `false` once the walk is done.
    fn walk_next_dir(&mut self) -> Result<bool> {
        let Some(dir) = self.dirs.pop() else {
            return Ok(false);
        };

        let pattern = format!("{}/*", glob::Pattern::escape(&dir.to_string_lossy()));
        let entries = glob::glob(&pattern).map_err(|e| BpgnError::io(&dir, io::Error::other(e)))?;

        let mut subdirs = Vec::new();
        let mut queued = 0usize;
        for entry in entries {
            let path = entry.map_err(|e| BpgnError::io(e.path().to_path_buf(), e.into_error()))?;
            if path.is_symlink() && path.is_dir() {
                continue;
            }
            if path.is_dir() {
                subdirs.push(path);
            } else if path.is_file() && CompressionMode::from_path(&path).is_some() {
                self.pending.push_back(path);
                queued += 1;
            }
        }

        tracing::debug!(dir = %dir.display(), queued, subdirs = subdirs.len(), "walked directory");

        // Children go on the stack last-first so they are visited in listing order.
        self.dirs.extend(subdirs.into_iter().rev());
        Ok(true)
    }
}

impl Iterator for DirectoryGames {
    type Item = Result<Game>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(active) = self.active.as_mut() {
                match active.next() {
                    Some(Ok(game)) => return Some(Ok(game)),
                    Some(Err(e)) => {
                        // The rest of a malformed file is not trusted.
                        self.active = None;
                        return Some(Err(e));
                    }
                    None => self.active = None,
                }
                continue;
            }

            if let Some(path) = self.pending.pop_front() {
                match FileGames::open(path, &self.options) {
                    Ok(file) => self.active = Some(file),
                    Err(e) => return Some(Err(e)),
                }
                continue;
            }

            match self.walk_next_dir() {
                Ok(true) => {}
                Ok(false) => return None,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Games from a single file or from a directory tree.
pub enum Games {
    File(FileGames),
    Directory(DirectoryGames),
}

impl Iterator for Games {
    type Item = Result<Game>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::File(games) => games.next(),
            Self::Directory(games) => games.next(),
        }
    }
}

/// Open `path` as a game source: a file yields its own games, a directory the
/// games of every game file below it.
pub fn open_games(path: impl AsRef<Path>, options: ReadOptions) -> Result<Games> {
    let path = path.as_ref();
    if path.is_file() {
        Ok(Games::File(FileGames::open(path, &options)?))
    } else if path.is_dir() {
        Ok(Games::Directory(DirectoryGames::new(path, options)))
    } else {
        Err(BpgnError::InvalidPath(path.to_path_buf()))
    }
}
