use super::error::{BpgnError, Result, SourcePos};
use super::types::{Game, Move, MoveComments, MoveLabel, Player};

/// Terminal markers, anchored to the end of the movetext.
pub const RESULT_MARKERS: [&str; 5] = ["0-0", "0-1", "1-0", "1/2-1/2", "*"];

const CASTLING: [&str; 2] = ["O-O-O", "O-O"];
const PIECES: &[u8] = b"PNBRQK";
const PROMOTIONS: &[u8] = b"PNBRQKpnbrqk";

/// Whether `movetext` ends in one of the terminal result markers.
pub fn has_result_marker(movetext: &str) -> bool {
    RESULT_MARKERS.iter().any(|marker| movetext.ends_with(marker))
}

/// A single classified movetext token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    Comment(&'a str),
    MoveMarker(MoveLabel),
    Notation(&'a str),
    Result(&'a str),
}

/// A token together with the unconsumed input it was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lexeme<'a> {
    pub token: Token<'a>,
    pub at: &'a str,
}

/// Left-anchored scanner over one game's movetext.
///
/// Every step classifies the front of the remaining input in priority order
/// (comment, move-number marker, notation, result) and consumes exactly one
/// token. Scanning stops once only whitespace is left, or after the first
/// unrecognized remainder.
pub struct Lexer<'a, 'p> {
    rest: &'a str,
    pos: &'p SourcePos,
    failed: bool,
}

impl<'a, 'p> Lexer<'a, 'p> {
    pub fn new(movetext: &'a str, pos: &'p SourcePos) -> Self {
        Self {
            rest: movetext,
            pos,
            failed: false,
        }
    }

    fn classify(rest: &'a str) -> Option<(Token<'a>, usize)> {
        scan_comment(rest)
            .or_else(|| scan_move_marker(rest))
            .or_else(|| scan_notation(rest))
            .or_else(|| scan_result(rest))
    }
}

impl<'a> Iterator for Lexer<'a, '_> {
    type Item = Result<Lexeme<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.rest.trim().is_empty() {
            return None;
        }

        let at = self.rest;
        match Self::classify(at) {
            Some((token, consumed)) => {
                tracing::trace!(?token, "lexed movetext token");
                self.rest = &at[consumed..];
                Some(Ok(Lexeme { token, at }))
            }
            None => {
                self.failed = true;
                Some(Err(BpgnError::UnrecognizedToken {
                    remainder: at.to_string(),
                    pos: self.pos.clone(),
                }))
            }
        }
    }
}

fn trailing_whitespace(s: &str) -> usize {
    s.len() - s.trim_start().len()
}

/// `{text}` plus any whitespace after the closing brace.
fn scan_comment(rest: &str) -> Option<(Token<'_>, usize)> {
    let body = rest.strip_prefix('{')?;
    let close = body.find('}')?;
    let end = close + 2;
    Some((
        Token::Comment(&body[..close]),
        end + trailing_whitespace(&rest[end..]),
    ))
}

/// `<digits><AaBb>.` plus any whitespace after the dot.
fn scan_move_marker(rest: &str) -> Option<(Token<'_>, usize)> {
    let bytes = rest.as_bytes();
    let digits = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }

    let player = Player::from_letter(char::from(*bytes.get(digits)?))?;
    if bytes.get(digits + 1) != Some(&b'.') {
        return None;
    }

    let ply = rest[..digits].parse::<u32>().ok()?;
    let end = digits + 2;
    Some((
        Token::MoveMarker(MoveLabel::new(ply, player)),
        end + trailing_whitespace(&rest[end..]),
    ))
}

fn is_hint(b: &u8) -> bool {
    matches!(b, b'a'..=b'h' | b'1'..=b'8')
}

fn is_square(bytes: &[u8], at: usize) -> bool {
    matches!(
        (bytes.get(at), bytes.get(at + 1)),
        (Some(b'a'..=b'h'), Some(b'1'..=b'8'))
    )
}

/// Length of the notation body (before any check suffix) at the front of `rest`.
///
/// `[piece][hint][x|@]square[=promo]`. The hint is greedy over at most two
/// characters and gives ground one at a time until a destination square fits,
/// so `Nbd7` and `e8=Q` split the same way a backtracking matcher would.
fn san_body_len(rest: &str) -> Option<usize> {
    if let Some(castle) = CASTLING.iter().find(|c| rest.starts_with(**c)) {
        return Some(castle.len());
    }

    let bytes = rest.as_bytes();
    let start = usize::from(bytes.first().is_some_and(|b| PIECES.contains(b)));
    let max_hint = bytes[start..].iter().take(2).take_while(|b| is_hint(b)).count();

    for hint in (0..=max_hint).rev() {
        let mut at = start + hint;
        if matches!(bytes.get(at), Some(b'x' | b'@')) {
            at += 1;
        }
        if !is_square(bytes, at) {
            continue;
        }

        at += 2;
        if bytes.get(at) == Some(&b'=') && bytes.get(at + 1).is_some_and(|b| PROMOTIONS.contains(b))
        {
            at += 2;
        }
        return Some(at);
    }

    None
}

/// Castling or a SAN-like move, an optional `+`/`#`, then whitespace.
fn scan_notation(rest: &str) -> Option<(Token<'_>, usize)> {
    let mut end = san_body_len(rest)?;
    if matches!(rest.as_bytes().get(end), Some(b'+' | b'#')) {
        end += 1;
    }
    Some((
        Token::Notation(&rest[..end]),
        end + trailing_whitespace(&rest[end..]),
    ))
}

/// A terminal marker, only when it is all that remains.
fn scan_result(rest: &str) -> Option<(Token<'_>, usize)> {
    let trimmed = rest.trim_end();
    RESULT_MARKERS
        .iter()
        .find(|marker| **marker == trimmed)
        .map(|marker| (Token::Result(marker), rest.len()))
}

/// A move whose marker has been read but which has not been closed yet.
struct OpenMove<'a> {
    label: MoveLabel,
    notation: Option<&'a str>,
    comments: MoveComments,
}

impl<'a> OpenMove<'a> {
    fn new(label: MoveLabel) -> Self {
        Self {
            label,
            notation: None,
            comments: MoveComments::new(),
        }
    }

    fn close(self, pos: &SourcePos) -> Result<Move> {
        let Some(notation) = self.notation else {
            return Err(BpgnError::MissingNotation {
                label: self.label,
                pos: pos.clone(),
            });
        };

        Ok(Move {
            label: self.label,
            notation: notation.to_string(),
            comments: self.comments,
        })
    }
}

/// Lex `movetext` and append its moves and game-level comments to `game`.
///
/// A comment attaches to the move opened most recently, or to the game when no
/// move is open yet. The terminal marker must equal the game's `Result` tag.
pub fn parse_movetext(movetext: &str, game: &mut Game, pos: &SourcePos) -> Result<()> {
    let mut open: Option<OpenMove<'_>> = None;

    for lexeme in Lexer::new(movetext, pos) {
        let Lexeme { token, at } = lexeme?;
        match token {
            Token::Comment(text) => match open.as_mut() {
                Some(m) => m.comments.push(text.to_string()),
                None => game.comments.push(text.to_string()),
            },
            Token::MoveMarker(label) => {
                if let Some(previous) = open.replace(OpenMove::new(label)) {
                    game.moves.push(previous.close(pos)?);
                }
            }
            Token::Notation(notation) => match open.as_mut() {
                Some(m) if m.notation.is_none() => m.notation = Some(notation),
                _ => {
                    return Err(BpgnError::UnrecognizedToken {
                        remainder: at.to_string(),
                        pos: pos.clone(),
                    });
                }
            },
            Token::Result(marker) => {
                if game.result() != Some(marker) {
                    return Err(BpgnError::ResultMismatch {
                        tag: game.result().map(str::to_string),
                        movetext: marker.to_string(),
                        pos: pos.clone(),
                    });
                }
            }
        }
    }

    if let Some(last) = open {
        game.moves.push(last.close(pos)?);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(ply: u32, letter: char) -> MoveLabel {
        MoveLabel::new(ply, Player::from_letter(letter).unwrap())
    }

    fn tokens(movetext: &str) -> Vec<Token<'_>> {
        let pos = SourcePos::detached();
        Lexer::new(movetext, &pos)
            .map(|lexeme| lexeme.map(|l| l.token))
            .collect::<Result<Vec<_>>>()
            .unwrap()
    }

    fn game_with_result(result: &str) -> Game {
        let mut game = Game::new("start");
        game.tags.insert("Result".to_string(), result.to_string());
        game
    }

    fn notations(game: &Game) -> Vec<&str> {
        game.moves.iter().map(|m| m.notation.as_str()).collect()
    }

    #[test]
    fn test_lexer_classifies_every_token_kind() {
        assert_eq!(
            tokens("{start} 1A. e4 {30.1} 1-0"),
            vec![
                Token::Comment("start"),
                Token::MoveMarker(label(1, 'A')),
                Token::Notation("e4"),
                Token::Comment("30.1"),
                Token::Result("1-0"),
            ]
        );
    }

    #[test]
    fn test_lexer_notation_shapes() {
        for san in [
            "e4", "exd5", "Nf3", "Nbd7", "R1e2", "Qh4e1", "N@f6", "P@e6", "e8=Q", "bxa1=N",
            "O-O", "O-O-O", "Qxf7#", "Bb5+", "O-O+",
        ] {
            let text = format!("1A. {} *", san);
            assert_eq!(
                tokens(&text)[1],
                Token::Notation(san),
                "notation {} was not lexed whole",
                san
            );
        }
    }

    #[test]
    fn test_lexer_splits_lines_joined_without_separator() {
        // "...e5" + "2A. Nf3" joined verbatim.
        assert_eq!(
            tokens("1a. e52A. Nf3 *"),
            vec![
                Token::MoveMarker(label(1, 'a')),
                Token::Notation("e5"),
                Token::MoveMarker(label(2, 'A')),
                Token::Notation("Nf3"),
                Token::Result("*"),
            ]
        );
    }

    #[test]
    fn test_lexer_result_only_at_end() {
        let pos = SourcePos::detached();
        let err = Lexer::new("1A. e4 1-0 1B. d4", &pos)
            .collect::<Result<Vec<_>>>()
            .unwrap_err();
        match err {
            BpgnError::UnrecognizedToken { remainder, .. } => {
                assert_eq!(remainder, "1-0 1B. d4");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_lexer_stops_after_first_error() {
        let pos = SourcePos::detached();
        let mut lexer = Lexer::new("?? 1A. e4", &pos);
        assert!(lexer.next().unwrap().is_err());
        assert!(lexer.next().is_none());
    }

    #[test]
    fn test_lexer_ignores_trailing_whitespace() {
        assert_eq!(
            tokens("1A. e4   "),
            vec![Token::MoveMarker(label(1, 'A')), Token::Notation("e4")]
        );
        assert!(tokens("   ").is_empty());
    }

    #[test]
    fn test_parse_movetext_attaches_comment_to_open_move() {
        let mut game = game_with_result("1-0");
        let pos = SourcePos::detached();
        parse_movetext("1A. e4 1B. e5 {comment} 2A. Nf3 1-0", &mut game, &pos).unwrap();

        let labels: Vec<_> = game.moves.iter().map(|m| m.label).collect();
        assert_eq!(labels, vec![label(1, 'A'), label(1, 'B'), label(2, 'A')]);
        assert_eq!(notations(&game), vec!["e4", "e5", "Nf3"]);
        assert!(game.moves[0].comments.is_empty());
        assert_eq!(game.moves[1].comments.as_slice(), ["comment".to_string()]);
        assert!(game.moves[2].comments.is_empty());
        assert!(game.comments.is_empty());
    }

    #[test]
    fn test_parse_movetext_comment_before_first_move_goes_to_game() {
        let mut game = game_with_result("*");
        let pos = SourcePos::detached();
        parse_movetext("{ bughouse } 1A. d4 *", &mut game, &pos).unwrap();
        assert_eq!(game.comments, vec![" bughouse ".to_string()]);
        assert_eq!(notations(&game), vec!["d4"]);
    }

    #[test]
    fn test_parse_movetext_result_mismatch() {
        let pos = SourcePos::detached();
        let mut game = game_with_result("0-1");
        let err = parse_movetext("1A. e4 1B. e5 {comment} 2A. Nf3 1-0", &mut game, &pos)
            .unwrap_err();
        assert!(matches!(
            err,
            BpgnError::ResultMismatch { ref tag, ref movetext, .. }
                if tag.as_deref() == Some("0-1") && movetext == "1-0"
        ));

        let mut game = game_with_result("*");
        assert!(matches!(
            parse_movetext("1A. e4 1-0", &mut game, &pos),
            Err(BpgnError::ResultMismatch { .. })
        ));

        let mut game = game_with_result("1-0");
        assert!(parse_movetext("1A. e4 1-0", &mut game, &pos).is_ok());
    }

    #[test]
    fn test_parse_movetext_missing_result_tag_is_mismatch() {
        let pos = SourcePos::detached();
        let mut game = Game::new("start");
        assert!(matches!(
            parse_movetext("1A. e4 *", &mut game, &pos),
            Err(BpgnError::ResultMismatch { tag: None, .. })
        ));
    }

    #[test]
    fn test_parse_movetext_marker_without_notation() {
        let pos = SourcePos::detached();
        let mut game = game_with_result("*");
        let err = parse_movetext("1A. e4 1a. 2A. d4 *", &mut game, &pos).unwrap_err();
        assert!(matches!(
            err,
            BpgnError::MissingNotation { label: l, .. } if l == label(1, 'a')
        ));

        let mut game = game_with_result("*");
        assert!(matches!(
            parse_movetext("1A. e4 1a. *", &mut game, &pos),
            Err(BpgnError::MissingNotation { .. })
        ));
    }

    #[test]
    fn test_parse_movetext_notation_without_open_move() {
        let pos = SourcePos::detached();
        let mut game = game_with_result("*");
        let err = parse_movetext("e4 1A. d4 *", &mut game, &pos).unwrap_err();
        assert!(matches!(
            err,
            BpgnError::UnrecognizedToken { ref remainder, .. } if remainder == "e4 1A. d4 *"
        ));

        let mut game = game_with_result("*");
        assert!(matches!(
            parse_movetext("1A. e4 d4 *", &mut game, &pos),
            Err(BpgnError::UnrecognizedToken { .. })
        ));
    }

    #[test]
    fn test_parse_movetext_unrecognized_token_reports_position() {
        let pos = SourcePos::new("club.bpgn", 42);
        let mut game = game_with_result("*");
        let err = parse_movetext("1A. e4 1B. Zz9 *", &mut game, &pos).unwrap_err();
        assert_eq!(
            err.to_string(),
            "don't know how to proceed with remaining movetext 'Zz9 *' at club.bpgn:42"
        );
    }

    #[test]
    fn test_has_result_marker() {
        assert!(has_result_marker("1A. e4 1/2-1/2"));
        assert!(has_result_marker("1A. e4 *"));
        assert!(has_result_marker("0-0"));
        assert!(!has_result_marker("1A. e4"));
        assert!(!has_result_marker("1A. e4 1-0 "));
    }
}
