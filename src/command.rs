use bytes::BytesMut;
use chrono::NaiveDate;
use tokio_util::codec::{Decoder, LinesCodec, LinesCodecError};

use crate::engine::EngineError;
use crate::limits::*;
use crate::model::*;

/// One line of front-end input.
#[derive(Debug, PartialEq)]
pub enum Command {
    Day(DayKey),
    Today,
    Next,
    Prev,
    Toggle(Hour),
    Range(Hour, Hour),
    Start(Hour),
    /// Clock boundary `1..=24`; the picker validates it against the start.
    End(u8),
    Drag {
        anchor: Hour,
        hovers: Vec<Hour>,
    },
    Clear,
    Grid,
    Show,
    Submit,
    Retry,
    Status,
    WhoAmI,
    Help,
    Quit,
}

pub const HELP: &str = "\
day YYYY-MM-DD | today | next | prev   pick the displayed day
toggle H                               select/deselect hour H (0-23)
range A B                              select hours A..=B
start H / end H                        pick a start time, then an end time (1-24)
drag A H [H...]                        press on A, drag over each H, release
clear                                  clear the displayed day
grid                                   show the displayed day hour by hour
show                                   list selected times
submit | retry | status                send, resend failed, inspect submissions
whoami | help | quit";

pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    if line.len() > MAX_COMMAND_LEN {
        return Err(CommandError::TooLong);
    }
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Err(CommandError::Empty);
    };
    let args: Vec<&str> = words.collect();

    match verb.to_ascii_lowercase().as_str() {
        "day" => {
            expect_args("day", &args, 1)?;
            let day = NaiveDate::parse_from_str(args[0], "%Y-%m-%d")
                .map_err(|e| CommandError::BadValue(format!("{}: {e}", args[0])))?;
            Ok(Command::Day(day))
        }
        "today" => no_args("today", &args, Command::Today),
        "next" => no_args("next", &args, Command::Next),
        "prev" => no_args("prev", &args, Command::Prev),
        "toggle" => {
            expect_args("toggle", &args, 1)?;
            Ok(Command::Toggle(parse_hour(args[0])?))
        }
        "range" => {
            expect_args("range", &args, 2)?;
            Ok(Command::Range(parse_hour(args[0])?, parse_hour(args[1])?))
        }
        "start" => {
            expect_args("start", &args, 1)?;
            Ok(Command::Start(parse_hour(args[0])?))
        }
        "end" => {
            expect_args("end", &args, 1)?;
            Ok(Command::End(parse_u8(args[0])?))
        }
        "drag" => {
            if args.len() < 2 {
                return Err(CommandError::WrongArity("drag", 2, args.len()));
            }
            if args.len() - 1 > MAX_DRAG_STEPS {
                return Err(CommandError::BadValue(format!(
                    "drag accepts at most {MAX_DRAG_STEPS} hover steps"
                )));
            }
            let anchor = parse_hour(args[0])?;
            let hovers = args[1..]
                .iter()
                .map(|a| parse_hour(a))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Command::Drag { anchor, hovers })
        }
        "clear" => no_args("clear", &args, Command::Clear),
        "grid" => no_args("grid", &args, Command::Grid),
        "show" => no_args("show", &args, Command::Show),
        "submit" => no_args("submit", &args, Command::Submit),
        "retry" => no_args("retry", &args, Command::Retry),
        "status" => no_args("status", &args, Command::Status),
        "whoami" => no_args("whoami", &args, Command::WhoAmI),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

fn expect_args(verb: &'static str, args: &[&str], n: usize) -> Result<(), CommandError> {
    if args.len() != n {
        return Err(CommandError::WrongArity(verb, n, args.len()));
    }
    Ok(())
}

fn no_args(verb: &'static str, args: &[&str], cmd: Command) -> Result<Command, CommandError> {
    expect_args(verb, args, 0)?;
    Ok(cmd)
}

fn parse_u8(s: &str) -> Result<u8, CommandError> {
    s.parse::<u8>()
        .map_err(|_| CommandError::BadValue(format!("expected a number, got {s:?}")))
}

fn parse_hour(s: &str) -> Result<Hour, CommandError> {
    Ok(Hour::new(parse_u8(s)?)?)
}

/// Frames input into one parsed command per line.
///
/// A bad line yields an `Err` item and decoding carries on with the next line:
/// an overlong line is discarded up to its newline, undecodable bytes are
/// reported, and blank lines are skipped.
pub struct CommandCodec {
    lines: LinesCodec,
}

impl Default for CommandCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandCodec {
    pub fn new() -> Self {
        Self {
            lines: LinesCodec::new_with_max_length(MAX_COMMAND_LEN),
        }
    }

    fn next_command(
        &mut self,
        buf: &mut BytesMut,
        eof: bool,
    ) -> Result<Option<Result<Command, CommandError>>, std::io::Error> {
        loop {
            let line = if eof {
                self.lines.decode_eof(buf)
            } else {
                self.lines.decode(buf)
            };
            match line {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => return Ok(Some(parse_command(&line))),
                Ok(None) => return Ok(None),
                Err(LinesCodecError::MaxLineLengthExceeded) => {
                    return Ok(Some(Err(CommandError::TooLong)));
                }
                Err(LinesCodecError::Io(e)) if e.kind() == std::io::ErrorKind::InvalidData => {
                    let err = CommandError::BadValue("input is not valid UTF-8".into());
                    return Ok(Some(Err(err)));
                }
                Err(LinesCodecError::Io(e)) => return Err(e),
            }
        }
    }
}

impl Decoder for CommandCodec {
    type Item = Result<Command, CommandError>;
    type Error = std::io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        self.next_command(buf, false)
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        self.next_command(buf, true)
    }
}

#[derive(Debug, PartialEq)]
pub enum CommandError {
    Empty,
    TooLong,
    Unknown(String),
    WrongArity(&'static str, usize, usize),
    BadValue(String),
    Invalid(EngineError),
}

impl From<EngineError> for CommandError {
    fn from(e: EngineError) -> Self {
        CommandError::Invalid(e)
    }
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::Empty => write!(f, "empty command"),
            CommandError::TooLong => write!(f, "command longer than {MAX_COMMAND_LEN} bytes"),
            CommandError::Unknown(s) => write!(f, "unknown command: {s} (try `help`)"),
            CommandError::WrongArity(verb, expected, got) => {
                write!(f, "{verb}: expected {expected} arguments, got {got}")
            }
            CommandError::BadValue(s) => write!(f, "bad value: {s}"),
            CommandError::Invalid(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for CommandError {}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use tokio_util::codec::FramedRead;

    fn h(n: u8) -> Hour {
        Hour::new(n).unwrap()
    }

    #[test]
    fn parse_day() {
        let cmd = parse_command("day 2024-01-16").unwrap();
        assert_eq!(cmd, Command::Day(NaiveDate::from_ymd_opt(2024, 1, 16).unwrap()));
    }

    #[test]
    fn parse_bad_day() {
        assert!(matches!(parse_command("day 2024-13-01"), Err(CommandError::BadValue(_))));
    }

    #[test]
    fn parse_toggle() {
        assert_eq!(parse_command("toggle 7").unwrap(), Command::Toggle(h(7)));
        assert_eq!(parse_command("  TOGGLE   0 ").unwrap(), Command::Toggle(h(0)));
    }

    #[test]
    fn parse_toggle_out_of_range_is_invalid_argument() {
        match parse_command("toggle 24") {
            Err(CommandError::Invalid(EngineError::InvalidArgument(_))) => {}
            other => panic!("expected InvalidArgument, got {other:?}"),
        }
    }

    #[test]
    fn parse_range_keeps_order() {
        assert_eq!(parse_command("range 9 4").unwrap(), Command::Range(h(9), h(4)));
    }

    #[test]
    fn parse_end_accepts_midnight_boundary() {
        assert_eq!(parse_command("end 24").unwrap(), Command::End(24));
        assert!(parse_command("end x").is_err());
    }

    #[test]
    fn parse_drag() {
        let cmd = parse_command("drag 5 6 7 3").unwrap();
        match cmd {
            Command::Drag { anchor, hovers } => {
                assert_eq!(anchor, h(5));
                assert_eq!(hovers, vec![h(6), h(7), h(3)]);
            }
            _ => panic!("expected Drag, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_drag_needs_a_hover() {
        assert_eq!(parse_command("drag 5"), Err(CommandError::WrongArity("drag", 2, 1)));
    }

    #[test]
    fn parse_drag_step_limit() {
        let line = format!("drag 1 {}", vec!["2"; MAX_DRAG_STEPS + 1].join(" "));
        assert!(matches!(parse_command(&line), Err(CommandError::BadValue(_))));
    }

    #[test]
    fn parse_arity_errors() {
        assert_eq!(parse_command("toggle"), Err(CommandError::WrongArity("toggle", 1, 0)));
        assert_eq!(parse_command("clear now"), Err(CommandError::WrongArity("clear", 0, 1)));
    }

    #[test]
    fn parse_empty_and_unknown() {
        assert_eq!(parse_command("   "), Err(CommandError::Empty));
        assert!(matches!(parse_command("book 5"), Err(CommandError::Unknown(_))));
    }

    #[test]
    fn parse_too_long() {
        let line = "x".repeat(MAX_COMMAND_LEN + 1);
        assert_eq!(parse_command(&line), Err(CommandError::TooLong));
    }

    // ── framing ──────────────────────────────────────────────

    #[tokio::test]
    async fn overlong_line_does_not_end_input() {
        let input = format!("{}\nhelp\n", "x".repeat(2000));
        let mut frames = FramedRead::new(input.as_bytes(), CommandCodec::new());
        assert_eq!(frames.next().await.unwrap().unwrap(), Err(CommandError::TooLong));
        assert_eq!(frames.next().await.unwrap().unwrap(), Ok(Command::Help));
        assert!(frames.next().await.is_none());
    }

    #[tokio::test]
    async fn framing_skips_blank_lines_and_reports_bad_ones() {
        let input = "toggle 7\n\n   \nbook 5\r\nquit";
        let mut frames = FramedRead::new(input.as_bytes(), CommandCodec::new());
        assert_eq!(frames.next().await.unwrap().unwrap(), Ok(Command::Toggle(h(7))));
        assert!(matches!(frames.next().await.unwrap().unwrap(), Err(CommandError::Unknown(_))));
        // last line without a newline still counts
        assert_eq!(frames.next().await.unwrap().unwrap(), Ok(Command::Quit));
        assert!(frames.next().await.is_none());
    }

    #[tokio::test]
    async fn invalid_utf8_line_is_skipped() {
        let input: &[u8] = b"\xff\xfe\nhelp\n";
        let mut frames = FramedRead::new(input, CommandCodec::new());
        assert!(matches!(frames.next().await.unwrap().unwrap(), Err(CommandError::BadValue(_))));
        assert_eq!(frames.next().await.unwrap().unwrap(), Ok(Command::Help));
    }

    #[test]
    fn parse_aliases() {
        assert_eq!(parse_command("?").unwrap(), Command::Help);
        assert_eq!(parse_command("exit").unwrap(), Command::Quit);
    }
}
