//! Navigation script parsing
//!
//! A script is a list of steps, one per line or one per command-line
//! argument. Blank lines and `#` comments are skipped.

use panelnav_core::AnimationKind;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// One instruction of a navigation script
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// `nav <panel> [<anim> [ms]]`
    Navigate {
        panel: String,
        animation: Option<AnimationKind>,
        length: Option<Duration>,
    },
    /// `back`
    Back,
    /// `lock`
    Lock,
    /// `unlock`
    Unlock,
    /// `tab <panel>`
    Tab { panel: String },
    /// `group`
    Group,
    /// `ungroup`
    Ungroup,
    /// `exit`
    Exit,
    /// `skip`
    Skip,
    /// `wait <ms>`
    Wait(Duration),
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Navigate {
                panel,
                animation,
                length,
            } => {
                write!(f, "nav {}", panel)?;
                if let Some(animation) = animation {
                    write!(f, " {}", animation)?;
                }
                if let Some(length) = length {
                    write!(f, " {}", length.as_millis())?;
                }
                Ok(())
            }
            Step::Back => f.write_str("back"),
            Step::Lock => f.write_str("lock"),
            Step::Unlock => f.write_str("unlock"),
            Step::Tab { panel } => write!(f, "tab {}", panel),
            Step::Group => f.write_str("group"),
            Step::Ungroup => f.write_str("ungroup"),
            Step::Exit => f.write_str("exit"),
            Step::Skip => f.write_str("skip"),
            Step::Wait(duration) => write!(f, "wait {}", duration.as_millis()),
        }
    }
}

/// Errors raised while reading a script
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    #[error("line {line}: unknown step '{word}'")]
    UnknownStep { line: usize, word: String },

    #[error("line {line}: '{step}' expects {expected}")]
    MissingArgument {
        line: usize,
        step: &'static str,
        expected: &'static str,
    },

    #[error("line {line}: unexpected argument '{argument}'")]
    UnexpectedArgument { line: usize, argument: String },

    #[error("line {line}: {message}")]
    InvalidArgument { line: usize, message: String },
}

/// Parse every step of a script, numbering lines from 1
pub fn parse_steps<'a, I>(lines: I) -> Result<Vec<Step>, ScriptError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut steps = Vec::new();
    for (index, line) in lines.into_iter().enumerate() {
        if let Some(step) = parse_line(index + 1, line)? {
            steps.push(step);
        }
    }
    Ok(steps)
}

/// Parse a single line; `None` for blanks and comments
pub fn parse_line(line: usize, text: &str) -> Result<Option<Step>, ScriptError> {
    let text = text.split('#').next().unwrap_or_default();
    let mut words = text.split_whitespace();
    let Some(keyword) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let step = match keyword.to_lowercase().as_str() {
        "nav" | "navigate" => parse_navigate(line, &args)?,
        "tab" => {
            let panel = required(line, &args, 0, "tab", "a panel name")?;
            no_more(line, &args, 1)?;
            Step::Tab {
                panel: panel.to_string(),
            }
        }
        "wait" => {
            let millis = required(line, &args, 0, "wait", "a duration in milliseconds")?;
            no_more(line, &args, 1)?;
            Step::Wait(parse_millis(line, millis)?)
        }
        "back" => bare(line, &args, Step::Back)?,
        "lock" => bare(line, &args, Step::Lock)?,
        "unlock" => bare(line, &args, Step::Unlock)?,
        "group" => bare(line, &args, Step::Group)?,
        "ungroup" => bare(line, &args, Step::Ungroup)?,
        "exit" => bare(line, &args, Step::Exit)?,
        "skip" => bare(line, &args, Step::Skip)?,
        _ => {
            return Err(ScriptError::UnknownStep {
                line,
                word: keyword.to_string(),
            })
        }
    };
    Ok(Some(step))
}

fn parse_navigate(line: usize, args: &[&str]) -> Result<Step, ScriptError> {
    let panel = required(line, args, 0, "nav", "a panel name")?;
    let animation = args
        .get(1)
        .map(|name| {
            name.parse::<AnimationKind>()
                .map_err(|message| ScriptError::InvalidArgument { line, message })
        })
        .transpose()?;
    let length = args.get(2).map(|ms| parse_millis(line, ms)).transpose()?;
    no_more(line, args, 3)?;

    Ok(Step::Navigate {
        panel: panel.to_string(),
        animation,
        length,
    })
}

fn required<'a>(
    line: usize,
    args: &[&'a str],
    index: usize,
    step: &'static str,
    expected: &'static str,
) -> Result<&'a str, ScriptError> {
    args.get(index).copied().ok_or(ScriptError::MissingArgument {
        line,
        step,
        expected,
    })
}

fn no_more(line: usize, args: &[&str], allowed: usize) -> Result<(), ScriptError> {
    match args.get(allowed) {
        Some(extra) => Err(ScriptError::UnexpectedArgument {
            line,
            argument: extra.to_string(),
        }),
        None => Ok(()),
    }
}

fn bare(line: usize, args: &[&str], step: Step) -> Result<Step, ScriptError> {
    no_more(line, args, 0)?;
    Ok(step)
}

fn parse_millis(line: usize, value: &str) -> Result<Duration, ScriptError> {
    value
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| ScriptError::InvalidArgument {
            line,
            message: format!("'{}' is not a duration in milliseconds", value),
        })
}
