//! api::message
//!
//! Commit message cleanup. Synchronous only: it is a pure in-memory
//! transform with nothing to wait on.

use std::marker::PhantomData;

use crate::core::error::ErrorInfo;
use crate::engine::{Runtime, Task};
use crate::git::Backend;

/// Comment prefix used when stripping comments.
pub const COMMENT_CHAR: u8 = b'#';

/// Clean up a commit message the way `git commit` does.
///
/// Trailing whitespace is removed from every line, runs of blank lines are
/// collapsed, leading and trailing blank lines are dropped, and the result
/// ends with a newline. With `strip_comments`, lines starting with `#` are
/// removed.
///
/// ```no_run
/// use gitteh::{message, Config, Runtime};
///
/// let rt = Runtime::new(&Config::default()).unwrap();
/// let text = message::prettify(&rt, "subject  \n\n\nbody\n# note\n", true).unwrap();
/// assert_eq!(text, "subject\n\nbody\n");
/// ```
pub fn prettify<B: Backend>(
    rt: &Runtime<B>,
    text: &str,
    strip_comments: bool,
) -> Result<String, ErrorInfo> {
    prettify_with(rt, text, strip_comments.then_some(COMMENT_CHAR))
}

/// [`prettify`] with an explicit comment character, or none.
///
/// # Errors
///
/// Argument error if `text` contains a NUL byte or `comment_char` is not a
/// printable ASCII character.
pub fn prettify_with<B: Backend>(
    rt: &Runtime<B>,
    text: &str,
    comment_char: Option<u8>,
) -> Result<String, ErrorInfo> {
    rt.run_sync(PrettifyTask::prepare(text, comment_char))
}

struct PrettifyTask<B> {
    text: String,
    comment_char: Option<u8>,
    _backend: PhantomData<fn() -> B>,
}

impl<B: Backend> PrettifyTask<B> {
    fn prepare(text: &str, comment_char: Option<u8>) -> Result<Self, ErrorInfo> {
        if text.contains('\0') {
            return Err(ErrorInfo::argument("message must not contain NUL bytes"));
        }
        if let Some(c) = comment_char {
            if !c.is_ascii_graphic() {
                return Err(ErrorInfo::argument(format!(
                    "comment character must be printable ASCII, got {:#04x}",
                    c
                )));
            }
        }
        Ok(Self {
            text: text.to_string(),
            comment_char,
            _backend: PhantomData,
        })
    }
}

impl<B: Backend> Task<B> for PrettifyTask<B> {
    type Raw = String;
    type Output = String;

    const NAME: &'static str = "message.prettify";

    fn execute(&self, backend: &B, output: &mut Option<String>) -> Result<(), ErrorInfo> {
        *output = Some(backend.message_prettify(&self.text, self.comment_char)?);
        Ok(())
    }

    fn complete(raw: String) -> String {
        raw
    }
}
