use std::borrow::Cow;
use std::ffi::{OsStr, OsString};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::process::Command;

/// Placeholder telling the renderer to read the document from stdin.
pub const STDIN_PLACEHOLDER: &str = "-";

/// A fully assembled invocation: a program and its arguments, in order.
///
/// Spawned directly (never through a shell), so URLs and paths containing
/// spaces or metacharacters reach the renderer untouched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandLine {
    program: OsString,
    args: Vec<OsString>,
}
impl CommandLine {
    pub(crate) fn new(mut words: Vec<OsString>) -> Self {
        let program = if words.is_empty() { OsString::new() } else { words.remove(0) };
        Self { program, args: words }
    }

    pub fn program(&self) -> &OsStr {
        &self.program
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// Program followed by all arguments.
    pub fn words(&self) -> impl Iterator<Item = &OsStr> {
        std::iter::once(self.program.as_os_str()).chain(self.args.iter().map(OsString::as_os_str))
    }

    pub(crate) fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        command
    }
}
impl Display for CommandLine {
    /// Shell-quoted rendition, suitable for copy-pasting into a terminal.
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for (i, word) in self.words().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            let word = word.to_string_lossy();
            let quoted = shlex::try_quote(&word).unwrap_or(Cow::Borrowed(&word));
            f.write_str(&quoted)?;
        }
        Ok(())
    }
}

/// Split a raw option string into words using POSIX shell rules.
///
/// Strings that are not valid shell syntax (an unterminated quote, say) are
/// forwarded as a single word rather than rejected.
pub(crate) fn split_words(raw: &str) -> Vec<OsString> {
    match shlex::split(raw) {
        Some(words) => words.into_iter().map(OsString::from).collect(),
        None => {
            tracing::warn!(option = raw, "Unbalanced quoting in option; passing through as a single argument");
            vec![OsString::from(raw)]
        },
    }
}
