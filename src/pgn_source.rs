//! Streaming PGN input.
//!
//! [`PgnSource`] walks a PGN stream one game at a time and hands out
//! [`RawGame`] entries: the header tag pairs plus the main-line SAN tokens.
//! Nothing here knows about tracked identities; the extractor decides what
//! to keep.

use crate::errors::{AnalysisError, Result};
use pgn_reader::{BufferedReader, RawHeader, SanPlus, Skip, Visitor};
use std::collections::{BTreeMap, VecDeque};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// One game as found in the source, before any interpretation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawGame {
    /// Zero-based position of the game in its input, counted across every
    /// file of a [`PgnSources`] run
    pub index: usize,
    pub headers: BTreeMap<String, String>,
    /// Main-line moves in SAN, as written
    pub moves: Vec<String>,
}

impl RawGame {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    /// Builder used by tests and callers that assemble games by hand
    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_moves<I, S>(mut self, moves: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.moves = moves.into_iter().map(Into::into).collect();
        self
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }

    /// Header value, or an empty string when absent
    pub fn header_or_empty(&self, key: &str) -> String {
        self.header(key).unwrap_or_default().to_string()
    }

    pub fn ply_count(&self) -> usize {
        self.moves.len()
    }
}

/// PGN visitor collecting headers and main-line moves of a single game
struct RawGameCollector {
    current: RawGame,
    next_index: usize,
    decode_error: Option<String>,
}

impl RawGameCollector {
    fn new() -> Self {
        Self {
            current: RawGame::default(),
            next_index: 0,
            decode_error: None,
        }
    }
}

impl Visitor for RawGameCollector {
    type Result = Result<RawGame>;

    fn begin_game(&mut self) {
        self.current = RawGame::new(self.next_index);
        self.next_index += 1;
        self.decode_error = None;
    }

    fn header(&mut self, key: &[u8], value: RawHeader<'_>) {
        let key = match std::str::from_utf8(key) {
            Ok(key) => key.to_string(),
            Err(_) => {
                self.decode_error
                    .get_or_insert_with(|| "header name is not valid UTF-8".to_string());
                return;
            }
        };

        match value.decode_utf8() {
            Ok(value) => {
                self.current.headers.insert(key, value.into_owned());
            }
            Err(_) => {
                self.decode_error
                    .get_or_insert_with(|| format!("header '{}' is not valid UTF-8", key));
            }
        }
    }

    fn san(&mut self, san_plus: SanPlus) {
        self.current.moves.push(san_plus.to_string());
    }

    fn begin_variation(&mut self) -> Skip {
        Skip(true) // Only the main line counts
    }

    fn end_game(&mut self) -> Self::Result {
        let game = std::mem::take(&mut self.current);
        match self.decode_error.take() {
            Some(reason) => Err(AnalysisError::MalformedEntry {
                index: game.index,
                reason,
            }),
            None => Ok(game),
        }
    }
}

/// Lazy, single-pass iterator over the games of a PGN stream.
///
/// Yields one item per game. A game whose headers cannot be decoded is
/// yielded as `Err(MalformedEntry)` and reading continues; an I/O error is
/// yielded once and ends the stream.
pub struct PgnSource<R: Read> {
    reader: BufferedReader<R>,
    collector: RawGameCollector,
    first_index: usize,
    finished: bool,
}

impl<R: Read> PgnSource<R> {
    pub fn new(inner: R) -> Self {
        Self {
            reader: BufferedReader::new(inner),
            collector: RawGameCollector::new(),
            first_index: 0,
            finished: false,
        }
    }

    /// Number the games of this source from `first` instead of 0
    pub fn with_first_index(mut self, first: usize) -> Self {
        self.first_index = first;
        self.collector.next_index = first;
        self
    }

    /// Number of games read so far
    pub fn games_read(&self) -> usize {
        self.collector.next_index - self.first_index
    }

    /// Index the next game will get
    pub fn next_index(&self) -> usize {
        self.collector.next_index
    }
}

impl PgnSource<File> {
    /// Open a PGN file. A missing file is reported to the caller, who
    /// decides whether that is fatal.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            AnalysisError::IoError(format!("cannot open {}: {}", path.display(), e))
        })?;
        Ok(Self::new(file))
    }
}

impl<R: Read> Iterator for PgnSource<R> {
    type Item = Result<RawGame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.reader.read_game(&mut self.collector) {
            Ok(Some(game)) => Some(game),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(error) => {
                self.finished = true;
                Some(Err(error.into()))
            }
        }
    }
}

/// Several PGN sources read back to back.
///
/// Game indices keep counting across sources, so an index names exactly one
/// game of the whole input.
pub struct PgnSources<R: Read> {
    pending: VecDeque<PgnSource<R>>,
    current: Option<PgnSource<R>>,
    next_index: usize,
}

impl<R: Read> PgnSources<R> {
    pub fn new<I: IntoIterator<Item = PgnSource<R>>>(sources: I) -> Self {
        Self {
            pending: sources.into_iter().collect(),
            current: None,
            next_index: 0,
        }
    }
}

impl PgnSources<File> {
    /// Open every file up front, so a bad path fails before any game is read
    pub fn from_paths<I, P>(paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let sources = paths
            .into_iter()
            .map(PgnSource::<File>::from_path)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(sources))
    }
}

impl<R: Read> Iterator for PgnSources<R> {
    type Item = Result<RawGame>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(current) = self.current.as_mut() {
                if let Some(item) = current.next() {
                    return Some(item);
                }
                self.next_index = current.next_index();
                self.current = None;
            }

            let source = self.pending.pop_front()?;
            self.current = Some(source.with_first_index(self.next_index));
        }
    }
}
